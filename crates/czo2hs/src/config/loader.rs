use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let compiled =
        jsonschema::JSONSchema::compile(&schema).map_err(|e| ConfigError::Validation {
            message: format!("Failed to compile JSON schema: {}", e),
        })?;

    let result = compiled.validate(json_value);
    if let Err(errors) = result {
        let error_messages: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.repository.base_url.is_empty() {
        return Err(ConfigError::Validation {
            message: "repository.base_url must not be empty".to_string(),
        });
    }

    if !(config.big_file_threshold_mb > 0.0) {
        return Err(ConfigError::Validation {
            message: format!(
                "big_file_threshold_mb must be positive, got {}",
                config.big_file_threshold_mb
            ),
        });
    }

    let mut seen = std::collections::HashSet::new();
    for mapping in &config.groups {
        if !seen.insert(mapping.czo.to_lowercase()) {
            return Err(ConfigError::Validation {
                message: format!("Duplicate group mapping for '{}'", mapping.czo),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordSelection;
    use crate::error::ConfigError;

    #[test]
    fn test_load_valid_config() {
        let config_json = r#"
        {
            "repository": {
                "base_url": "https://dev-hs-6.cuahsi.org",
                "username": "czo",
                "password": "secret"
            },
            "records_path": "data/czo.json",
            "groups": [
                {"czo": "boulder", "group": "CZO Boulder"},
                {"czo": "sierra", "group": "CZO Sierra"}
            ]
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.records_path, "data/czo.json");
        assert_eq!(config.groups.len(), 2);
        // Defaults
        assert_eq!(config.big_file_threshold_mb, 500.0);
        assert!(!config.unknown_size_is_reference);
        assert!(config.use_cached_files);
        assert!(!config.skip_already_migrated);
        assert!(matches!(config.selection, RecordSelection::All));
    }

    #[test]
    fn test_load_config_with_selection_variants() {
        let first_n = r#"
        {
            "repository": {"base_url": "http://localhost:8000", "username": "u", "password": "p"},
            "records_path": "data/czo.json",
            "selection": {"first_n": 3}
        }
        "#;
        let config = load_config_from_str(first_n).unwrap();
        assert!(matches!(config.selection, RecordSelection::FirstN(3)));

        let ids = r#"
        {
            "repository": {"base_url": "http://localhost:8000", "username": "u", "password": "p"},
            "records_path": "data/czo.json",
            "selection": {"ids": ["3884"]}
        }
        "#;
        let config = load_config_from_str(ids).unwrap();
        assert!(matches!(config.selection, RecordSelection::Ids(ref v) if v == &["3884"]));
    }

    #[test]
    fn test_schema_rejects_wrong_type() {
        let config_json = r#"
        {
            "repository": {"base_url": "http://localhost", "username": "u", "password": "p"},
            "records_path": "data/czo.json",
            "big_file_threshold_mb": "five hundred"
        }
        "#;
        let err = load_config_from_str(config_json).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_schema_rejects_unknown_key() {
        let config_json = r#"
        {
            "repository": {"base_url": "http://localhost", "username": "u", "password": "p"},
            "records_path": "data/czo.json",
            "bigfile_threshold": 500
        }
        "#;
        let err = load_config_from_str(config_json).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_schema_rejects_missing_repository() {
        let config_json = r#"{ "records_path": "data/czo.json" }"#;
        let err = load_config_from_str(config_json).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config_json = r#"
        {
            "repository": {"base_url": "", "username": "u", "password": "p"},
            "records_path": "data/czo.json"
        }
        "#;
        assert!(load_config_from_str(config_json).is_err());
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let config_json = r#"
        {
            "repository": {"base_url": "http://localhost", "username": "u", "password": "p"},
            "records_path": "data/czo.json",
            "big_file_threshold_mb": 0.0
        }
        "#;
        assert!(load_config_from_str(config_json).is_err());
    }

    #[test]
    fn test_duplicate_group_mapping_rejected() {
        let config_json = r#"
        {
            "repository": {"base_url": "http://localhost", "username": "u", "password": "p"},
            "records_path": "data/czo.json",
            "groups": [
                {"czo": "Boulder", "group": "CZO Boulder"},
                {"czo": "boulder", "group": "CZO Boulder 2"}
            ]
        }
        "#;
        assert!(load_config_from_str(config_json).is_err());
    }
}
