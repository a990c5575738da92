use crate::cache::CheckpointId;
use crate::config::types::{Config, RetryConfig};
use crate::config::ConfigError;
use crate::models::{FieldSpec, ListingField, POSTCODE_COLUMN, TEXT_COLUMN};

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.n_per_region < 1 {
        return Err(ConfigError::Validation(
            "n_per_region must be at least 1".to_string(),
        ));
    }

    if let Some(id) = &config.import_cache {
        id.parse::<CheckpointId>()
            .map_err(|e| ConfigError::Validation(format!("import_cache: {}", e)))?;
    }

    validate_fields(&config.fields_of_interest)?;
    validate_retry(&config.retry)?;

    if config.site.search_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site.search_url cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_fields(spec: &FieldSpec) -> Result<(), ConfigError> {
    let any_field = ListingField::ALL.iter().any(|f| spec.wants(*f));
    if !any_field && !spec.text {
        return Err(ConfigError::Validation(
            "fields_of_interest must select at least one field".to_string(),
        ));
    }

    // Keywords become columns next to the fixed ones
    for keyword in spec.keywords() {
        if keyword.trim().is_empty() {
            return Err(ConfigError::Validation(
                "text_values cannot contain an empty keyword".to_string(),
            ));
        }
        let reserved = keyword == POSTCODE_COLUMN
            || keyword == TEXT_COLUMN
            || ListingField::ALL.iter().any(|f| f.column() == keyword);
        if reserved {
            return Err(ConfigError::Validation(format!(
                "text_values keyword '{}' clashes with a column of the same name",
                keyword
            )));
        }
    }

    Ok(())
}

fn validate_retry(retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.connect_attempts < 1 {
        return Err(ConfigError::Validation(
            "retry.connect_attempts must be at least 1".to_string(),
        ));
    }
    if retry.run_attempts < 1 {
        return Err(ConfigError::Validation(
            "retry.run_attempts must be at least 1".to_string(),
        ));
    }
    Ok(())
}
