use std::collections::HashMap;

use crate::config::GroupMapping;
use crate::metadata::Creator;

/// Maps the export's (group, person-name, email) triple to a creator entry.
/// The organizational mapping is policy data, so it is injected rather than
/// hardcoded in the assembler.
pub trait CreatorResolver {
    fn resolve(&self, group: &str, name: &str, email: &str) -> Creator;
}

/// Resolver backed by the configured group directory. Group names are
/// matched case-insensitively; a pipe-delimited group list uses its first
/// entry; unknown groups fall back to a default organization.
pub struct GroupDirectory {
    by_czo: HashMap<String, String>,
    default_organization: String,
}

impl GroupDirectory {
    pub fn new(mappings: &[GroupMapping]) -> Self {
        let by_czo = mappings
            .iter()
            .map(|m| (m.czo.trim().to_lowercase(), m.group.clone()))
            .collect();
        Self {
            by_czo,
            default_organization: "CZO".to_string(),
        }
    }

    pub fn with_default_organization(mut self, organization: impl Into<String>) -> Self {
        self.default_organization = organization.into();
        self
    }
}

impl CreatorResolver for GroupDirectory {
    fn resolve(&self, group: &str, name: &str, email: &str) -> Creator {
        let primary = group.split('|').next().unwrap_or("").trim().to_lowercase();
        let organization = self
            .by_czo
            .get(&primary)
            .cloned()
            .unwrap_or_else(|| self.default_organization.clone());

        Creator {
            name: name.trim().to_string(),
            organization,
            email: email.trim().to_string(),
        }
    }
}
