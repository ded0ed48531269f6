use std::collections::HashMap;
use std::fmt;
use std::io;

use crate::files::TransferMode;
use crate::pipeline::context::MigrationResult;

/// One row of the source-id ↔ target-id lookup table.
#[derive(Debug, Clone)]
pub struct LookupRow {
    pub source_id: String,
    pub target_id: Option<String>,
    pub success: bool,
}

/// Run-scoped aggregate of per-record outcomes. This is the only place
/// run-level totals are computed; the pipeline components never accumulate
/// cross-record state. One ledger per run, never shared across runs.
#[derive(Default)]
pub struct ProgressLedger {
    big_file_threshold_mb: f64,
    succeeded: Vec<MigrationResult>,
    failed: Vec<MigrationResult>,
    skipped: usize,
    lookup: Vec<LookupRow>,
    index: HashMap<String, usize>,
}

impl ProgressLedger {
    pub fn new(big_file_threshold_mb: f64) -> Self {
        Self {
            big_file_threshold_mb,
            ..Self::default()
        }
    }

    /// Consumes one record's outcome. Skipped results are tallied but do not
    /// re-enter the lookup table (their row is already there).
    pub fn record(&mut self, result: MigrationResult) {
        if result.skipped {
            self.skipped += 1;
            return;
        }

        let row = LookupRow {
            source_id: result.source_id.clone(),
            target_id: result.target_id.clone(),
            success: result.success,
        };
        self.index
            .entry(row.source_id.clone())
            .or_insert(self.lookup.len());
        self.lookup.push(row);

        if result.success {
            self.succeeded.push(result);
        } else {
            self.failed.push(result);
        }
    }

    /// Resumability lookup: the first recorded row for a source id.
    pub fn find(&self, source_id: &str) -> Option<&LookupRow> {
        self.index.get(source_id).map(|&i| &self.lookup[i])
    }

    pub fn lookup_rows(&self) -> &[LookupRow] {
        &self.lookup
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn error_count(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    pub fn summary(&self) -> RunSummary {
        let mut concrete_mb = 0.0;
        let mut reference_mb = 0.0;
        let mut big_reference_files = Vec::new();

        for result in self.succeeded.iter().chain(self.failed.iter()) {
            for file in &result.uploaded_files {
                let size = file.size_mb.unwrap_or(0.0);
                match file.transfer_mode {
                    TransferMode::Concrete => concrete_mb += size,
                    TransferMode::Reference => {
                        reference_mb += size;
                        if size > 0.0 && file.is_big(self.big_file_threshold_mb) {
                            big_reference_files.push(BigFileEntry {
                                source_id: result.source_id.clone(),
                                file_name: file.file_name.clone(),
                                size_mb: size,
                            });
                        }
                    }
                }
            }
        }

        let errors = self
            .failed
            .iter()
            .map(|r| ErrorEntry {
                source_id: r.source_id.clone(),
                target_id: r.target_id.clone(),
                messages: r
                    .error_messages
                    .iter()
                    .map(|m| m.replace('\n', " "))
                    .collect::<Vec<_>>()
                    .join(" | "),
            })
            .collect();

        RunSummary {
            total: self.succeeded.len() + self.failed.len(),
            success: self.succeeded.len(),
            error: self.failed.len(),
            skipped: self.skipped,
            big_file_threshold_mb: self.big_file_threshold_mb,
            concrete_mb,
            reference_mb,
            big_reference_files,
            errors,
        }
    }

    /// Seeds the lookup table from a previously written lookup CSV, so a
    /// resumed run can recognize (and with the skip policy enabled, skip)
    /// records migrated by an earlier run. Seeded rows are re-emitted by
    /// `write_lookup_table`, keeping the table cumulative across runs.
    /// Returns the number of rows taken over. Blank lines and the header
    /// are ignored; a row without a target id is kept as a failed attempt.
    pub fn seed_from_lookup<R: io::BufRead>(&mut self, reader: R) -> io::Result<usize> {
        let mut seeded = 0;
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with("czo_id") {
                continue;
            }

            let mut parts = line.splitn(3, ',');
            let source_id = match parts.next().map(str::trim) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => continue,
            };
            let target_id = parts
                .next()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from);
            let success = parts.next().map(str::trim) == Some("true");

            let row = LookupRow {
                source_id,
                target_id,
                success,
            };
            self.index
                .entry(row.source_id.clone())
                .or_insert(self.lookup.len());
            self.lookup.push(row);
            seeded += 1;
        }
        Ok(seeded)
    }

    /// Writes the lookup table as delimited text, suitable for persisting
    /// and for feeding a later resumed run via `seed_from_lookup`.
    pub fn write_lookup_table<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "czo_id,hs_id,success")?;
        for row in &self.lookup {
            writeln!(
                writer,
                "{},{},{}",
                row.source_id,
                row.target_id.as_deref().unwrap_or(""),
                row.success
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BigFileEntry {
    pub source_id: String,
    pub file_name: String,
    pub size_mb: f64,
}

#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub source_id: String,
    pub target_id: Option<String>,
    pub messages: String,
}

/// End-of-run report; `Display` renders the terminal-readable summary.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub skipped: usize,
    pub big_file_threshold_mb: f64,
    /// Megabytes moved byte-for-byte.
    pub concrete_mb: f64,
    /// Megabytes represented by registered references (bytes not moved).
    pub reference_mb: f64,
    pub big_reference_files: Vec<BigFileEntry>,
    pub errors: Vec<ErrorEntry>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========== Migration Summary ==========")?;
        writeln!(
            f,
            "Total: {}; Success: {}; Error: {}; Skipped: {}",
            self.total, self.success, self.error, self.skipped
        )?;
        writeln!(f, "Concrete files transferred: {:.2} MB", self.concrete_mb)?;
        writeln!(
            f,
            "Reference files registered: {:.2} MB",
            self.reference_mb
        )?;

        if !self.big_reference_files.is_empty() {
            writeln!(
                f,
                "Big reference files (> {:.0} MB):",
                self.big_file_threshold_mb
            )?;
            for entry in &self.big_reference_files {
                writeln!(
                    f,
                    "  CZO_ID {} {} {:.2} MB",
                    entry.source_id, entry.file_name, entry.size_mb
                )?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for (k, entry) in self.errors.iter().enumerate() {
                writeln!(
                    f,
                    "  {} CZO_ID {} HS_ID {} Error {}",
                    k + 1,
                    entry.source_id,
                    entry.target_id.as_deref().unwrap_or("-"),
                    entry.messages
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileDescriptor;
    use std::collections::BTreeMap;

    fn file(name: &str, mode: TransferMode, size_mb: Option<f64>) -> FileDescriptor {
        FileDescriptor {
            file_name: name.to_string(),
            source: format!("http://x/{}", name),
            transfer_mode: mode,
            size_mb,
            metadata: BTreeMap::new(),
        }
    }

    fn success_result(source_id: &str, files: Vec<FileDescriptor>) -> MigrationResult {
        let total_uploaded_mb = files
            .iter()
            .filter(|f| f.transfer_mode == TransferMode::Concrete)
            .filter_map(|f| f.size_mb)
            .sum();
        MigrationResult {
            source_id: source_id.to_string(),
            target_id: Some(format!("hs-{}", source_id)),
            success: true,
            skipped: false,
            error_messages: Vec::new(),
            uploaded_files: files,
            total_uploaded_mb,
        }
    }

    #[test]
    fn test_record_sorts_into_success_and_error_lists() {
        let mut ledger = ProgressLedger::new(500.0);
        ledger.record(success_result("1", vec![]));
        ledger.record(MigrationResult::failure("2", vec!["boom".to_string()]));

        assert_eq!(ledger.success_count(), 1);
        assert_eq!(ledger.error_count(), 1);
        assert_eq!(ledger.lookup_rows().len(), 2);
    }

    #[test]
    fn test_find_returns_lookup_row() {
        let mut ledger = ProgressLedger::new(500.0);
        ledger.record(success_result("3884", vec![]));

        let row = ledger.find("3884").unwrap();
        assert_eq!(row.target_id.as_deref(), Some("hs-3884"));
        assert!(row.success);
        assert!(ledger.find("9999").is_none());
    }

    #[test]
    fn test_skipped_results_counted_but_not_relisted() {
        let mut ledger = ProgressLedger::new(500.0);
        ledger.record(success_result("1", vec![]));
        ledger.record(MigrationResult::skipped("1", "hs-1"));

        assert_eq!(ledger.skipped_count(), 1);
        assert_eq!(ledger.lookup_rows().len(), 1);
        assert_eq!(ledger.summary().total, 1);
    }

    #[test]
    fn test_summary_splits_bytes_by_transfer_mode() {
        let mut ledger = ProgressLedger::new(500.0);
        ledger.record(success_result(
            "1",
            vec![
                file("small.csv", TransferMode::Concrete, Some(10.0)),
                file("big.zip", TransferMode::Reference, Some(600.0)),
                file("flagged.csv", TransferMode::Reference, Some(1.0)),
            ],
        ));

        let summary = ledger.summary();
        assert_eq!(summary.concrete_mb, 10.0);
        assert_eq!(summary.reference_mb, 601.0);
        // Only the over-threshold reference file is a "big file".
        assert_eq!(summary.big_reference_files.len(), 1);
        assert_eq!(summary.big_reference_files[0].file_name, "big.zip");
    }

    #[test]
    fn test_summary_skips_zero_size_big_files() {
        let mut ledger = ProgressLedger::new(500.0);
        ledger.record(success_result(
            "1",
            vec![file("unknown.bin", TransferMode::Reference, None)],
        ));

        let summary = ledger.summary();
        assert!(summary.big_reference_files.is_empty());
        assert_eq!(summary.reference_mb, 0.0);
    }

    #[test]
    fn test_summary_error_report_joins_messages() {
        let mut ledger = ProgressLedger::new(500.0);
        ledger.record(MigrationResult::failure(
            "7",
            vec!["first\nproblem".to_string(), "second".to_string()],
        ));

        let summary = ledger.summary();
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].messages, "first problem | second");

        let rendered = summary.to_string();
        assert!(rendered.contains("CZO_ID 7"));
        assert!(rendered.contains("first problem | second"));
    }

    #[test]
    fn test_seed_from_lookup_restores_prior_rows() {
        let mut ledger = ProgressLedger::new(500.0);
        let csv = "czo_id,hs_id,success\n3884,hs-0001,true\n2414,,false\n\n";
        let seeded = ledger.seed_from_lookup(csv.as_bytes()).unwrap();

        assert_eq!(seeded, 2);
        let row = ledger.find("3884").unwrap();
        assert_eq!(row.target_id.as_deref(), Some("hs-0001"));
        assert!(row.success);
        let failed = ledger.find("2414").unwrap();
        assert!(failed.target_id.is_none());
        assert!(!failed.success);
        // Seeded rows do not count as this run's outcomes.
        assert_eq!(ledger.success_count(), 0);
        assert_eq!(ledger.error_count(), 0);
    }

    #[test]
    fn test_seeded_rows_survive_a_rewrite() {
        let mut ledger = ProgressLedger::new(500.0);
        ledger
            .seed_from_lookup("czo_id,hs_id,success\n1,hs-1,true\n".as_bytes())
            .unwrap();
        ledger.record(success_result("2", vec![]));

        let mut out = Vec::new();
        ledger.write_lookup_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "czo_id,hs_id,success\n1,hs-1,true\n2,hs-2,true\n");
    }

    #[test]
    fn test_write_lookup_table() {
        let mut ledger = ProgressLedger::new(500.0);
        ledger.record(success_result("1", vec![]));
        ledger.record(MigrationResult::failure("2", vec!["boom".to_string()]));

        let mut out = Vec::new();
        ledger.write_lookup_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "czo_id,hs_id,success\n1,hs-1,true\n2,,false\n"
        );
    }
}
