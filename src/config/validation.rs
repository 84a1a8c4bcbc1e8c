//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, proxy and value ranges (multipliers, intervals, percentiles)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TransferConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;
use url::Url;

use crate::config::schema::TransferConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every semantic rule and collect all violations.
pub fn validate_config(config: &TransferConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_http_url(&mut errors, "endpoint.rpc_url", &config.endpoint.rpc_url);
    check_http_url(&mut errors, "endpoint.explorer_url", &config.endpoint.explorer_url);

    match config.endpoint.proxy_url() {
        Ok(Some(url)) if !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::new(
                "endpoint.proxy",
                format!("unsupported proxy scheme '{}'", url.scheme()),
            ));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("endpoint.proxy", e.to_string())),
    }

    if config.endpoint.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("endpoint.rpc_timeout_secs", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_delay_ms < config.retries.delay_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must not be lower than retries.delay_ms",
        ));
    }

    check_multiplier(&mut errors, "fees.gas_price_multiplier", config.fees.gas_price_multiplier);
    check_multiplier(&mut errors, "fees.gas_limit_multiplier", config.fees.gas_limit_multiplier);

    if config.fees.fee_history_blocks == 0 {
        errors.push(ValidationError::new("fees.fee_history_blocks", "must be at least 1"));
    }
    let percentile = config.fees.priority_fee_percentile;
    if !(0.0..=100.0).contains(&percentile) {
        errors.push(ValidationError::new(
            "fees.priority_fee_percentile",
            format!("{percentile} is outside 0..=100"),
        ));
    }

    let confirmation = &config.confirmation;
    if confirmation.poll_interval_secs == 0 {
        errors.push(ValidationError::new(
            "confirmation.poll_interval_secs",
            "must be greater than 0",
        ));
    } else if confirmation.poll_interval_secs > confirmation.timeout_secs {
        errors.push(ValidationError::new(
            "confirmation.poll_interval_secs",
            "must not exceed confirmation.timeout_secs",
        ));
    }

    if LevelFilter::from_str(&config.observability.log_level).is_err() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ValidationError>, field: &'static str, raw: &str) {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{raw}': {e}"))),
    }
}

fn check_multiplier(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if !value.is_finite() || value < 1.0 {
        errors.push(ValidationError::new(field, format!("{value} must be a finite factor >= 1.0")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TransferConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = TransferConfig::default();
        config.endpoint.rpc_url = "not a url".to_string();
        config.retries.max_attempts = 0;
        config.fees.gas_price_multiplier = 0.5;
        config.confirmation.poll_interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "endpoint.rpc_url",
                "retries.max_attempts",
                "fees.gas_price_multiplier",
                "confirmation.poll_interval_secs",
            ]
        );
    }

    #[test]
    fn test_rejects_bad_proxy_scheme_and_level() {
        let mut config = TransferConfig::default();
        config.endpoint.proxy = Some("ftp://proxy:21".to_string());
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().starts_with("endpoint.proxy"));
        assert_eq!(errors[1].field, "observability.log_level");
    }

    #[test]
    fn test_poll_interval_bounded_by_timeout() {
        let mut config = TransferConfig::default();
        config.confirmation.timeout_secs = 5;
        config.confirmation.poll_interval_secs = 10;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "confirmation.poll_interval_secs");
    }
}
