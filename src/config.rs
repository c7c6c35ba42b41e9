//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Backup and export configuration.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Product prefix used in exported file names.
    pub product: String,
    /// Directory exported backups and CSV files are written to.
    pub export_dir: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            product: "rental".to_string(),
            export_dir: PathBuf::from("./exports"),
        }
    }
}

impl BackupConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let product = product_or(std::env::var("RENTAL_OPS_PRODUCT").ok(), defaults.product);
        let export_dir = std::env::var("RENTAL_OPS_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.export_dir);
        Self {
            product,
            export_dir,
        }
    }
}

/// Communication configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    /// Delay inserted between consecutive messages of a bulk dispatch.
    pub pacing: Duration,
    /// Sender mailbox used by the email provider.
    pub email_from: String,
}

impl Default for CommsConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(1000),
            email_from: "Rental Desk <desk@rental.example>".to_string(),
        }
    }
}

impl CommsConfig {
    /// Build config from environment variables.
    ///
    /// An unparseable `RENTAL_OPS_PACING_MS` is an error, not a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let pacing = match std::env::var("RENTAL_OPS_PACING_MS") {
            Ok(raw) => parse_pacing_ms(&raw)?,
            Err(_) => defaults.pacing,
        };
        let email_from = std::env::var("RENTAL_OPS_EMAIL_FROM").unwrap_or(defaults.email_from);
        Ok(Self { pacing, email_from })
    }
}

/// Trimmed product prefix, or `default` when unset or blank.
fn product_or(raw: Option<String>, default: String) -> String {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

/// Parse a pacing value given in whole milliseconds.
fn parse_pacing_ms(raw: &str) -> Result<Duration, ConfigError> {
    let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: "RENTAL_OPS_PACING_MS".to_string(),
        message: format!("expected milliseconds, got {:?}", raw),
    })?;
    Ok(Duration::from_millis(ms))
}
