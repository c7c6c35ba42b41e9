//! Backup manager. Builds snapshots from the data source, validates and
//! restores them, and moves CSV exports in and out of the export directory.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join3;
use serde_json::Value;
use tracing::{error, info, warn};

use super::csv;
use super::record::{EntityKind, Record};
use super::snapshot::{self, RestoreReport, SUPPORTED_VERSIONS, Snapshot};
use super::source::DataSource;
use crate::config::BackupConfig;
use crate::error::BackupError;
use crate::storage::ExportDir;

/// `<product>-backup-<YYYY-MM-DD>.json`
pub fn backup_file_name(product: &str, at: DateTime<Utc>) -> String {
    format!("{}-backup-{}.json", product, at.format("%Y-%m-%d"))
}

/// `<product>-<entity>-<YYYY-MM-DD>.csv`
pub fn csv_file_name(product: &str, kind: EntityKind, at: DateTime<Utc>) -> String {
    format!("{}-{}-{}.csv", product, kind, at.format("%Y-%m-%d"))
}

/// Coordinates backup, restore, and CSV import/export.
pub struct BackupManager {
    source: Arc<dyn DataSource>,
    exports: ExportDir,
    config: BackupConfig,
}

impl BackupManager {
    pub fn new(source: Arc<dyn DataSource>, config: BackupConfig) -> Self {
        let exports = ExportDir::new(config.export_dir.clone());
        Self {
            source,
            exports,
            config,
        }
    }

    pub fn exports(&self) -> &ExportDir {
        &self.exports
    }

    /// Fetch every entity kind concurrently and stamp a new snapshot.
    pub async fn create_snapshot(&self) -> Result<Snapshot, BackupError> {
        let (cars, customers, bookings) = try_join3(
            self.fetch(EntityKind::Cars),
            self.fetch(EntityKind::Customers),
            self.fetch(EntityKind::Bookings),
        )
        .await?;

        let snapshot = Snapshot::new(cars, customers, bookings, Utc::now());
        info!(
            cars = snapshot.cars.len(),
            customers = snapshot.customers.len(),
            bookings = snapshot.bookings.len(),
            "Snapshot created"
        );
        Ok(snapshot)
    }

    async fn fetch(&self, kind: EntityKind) -> Result<Vec<Record>, BackupError> {
        self.source.fetch(kind).await.map_err(|source| {
            error!(entity = %kind, error = %source, "Data source fetch failed");
            BackupError::SourceUnavailable {
                entity: kind,
                source,
            }
        })
    }

    /// Validate a parsed backup document and summarize what it would restore.
    ///
    /// Writing the records back is left to the data-access layer; this only
    /// gates on structure and schema version.
    pub fn restore(&self, candidate: &Value) -> RestoreReport {
        if !snapshot::validate_structure(candidate) {
            warn!(error = %BackupError::StructuralValidationFailed, "Restore rejected");
            return RestoreReport::failed("Invalid backup file format");
        }

        let version = candidate["version"].as_str().unwrap_or_default();
        if !SUPPORTED_VERSIONS.contains(&version) {
            let err = BackupError::UnsupportedVersion(version.to_string());
            warn!(error = %err, "Restore rejected");
            return RestoreReport::failed(err.to_string());
        }

        let count = |kind: EntityKind| {
            candidate[kind.as_str()]
                .as_array()
                .map(Vec::len)
                .unwrap_or_default()
        };
        let summary = snapshot::restore_summary(
            count(EntityKind::Cars),
            count(EntityKind::Customers),
            count(EntityKind::Bookings),
        );
        info!(%summary, "Restore validated");
        RestoreReport::succeeded(summary)
    }

    /// Restore from an in-memory snapshot.
    pub fn restore_snapshot(&self, snapshot: &Snapshot) -> RestoreReport {
        match serde_json::to_value(snapshot) {
            Ok(candidate) => self.restore(&candidate),
            Err(e) => {
                error!(error = %e, "Snapshot could not be converted for restore");
                RestoreReport::failed(format!("Error restoring backup: {}", e))
            }
        }
    }

    /// Parse backup text and restore it, reporting parse failures in the report.
    pub fn restore_from_text(&self, text: &str) -> RestoreReport {
        match snapshot::parse(text) {
            Ok(candidate) => self.restore(&candidate),
            Err(e) => {
                warn!(error = %e, "Backup text could not be parsed");
                RestoreReport::failed(format!("Error restoring backup: {}", e))
            }
        }
    }

    /// Snapshot the data source and write it to the export directory.
    pub async fn save_backup(&self) -> Result<PathBuf, BackupError> {
        let snapshot = self.create_snapshot().await?;
        let text = snapshot::serialize(&snapshot)?;
        let name = backup_file_name(&self.config.product, Utc::now());
        let path = self
            .exports
            .write(&name, &text)
            .await
            .inspect_err(|e| error!(file = %name, error = %e, "Backup write failed"))?;
        info!(path = %path.display(), "Backup saved");
        Ok(path)
    }

    /// Load a backup file from the export directory.
    pub async fn load_backup(&self, name: &str) -> Result<Snapshot, BackupError> {
        let text = self
            .exports
            .read(name)
            .await
            .inspect_err(|e| error!(file = name, error = %e, "Backup read failed"))?;
        snapshot::deserialize(&text)
            .inspect_err(|e| warn!(file = name, error = %e, "Backup load failed"))
    }

    /// Export one entity kind to CSV. Returns `None` when there is nothing to export.
    pub async fn export_csv(&self, kind: EntityKind) -> Result<Option<PathBuf>, BackupError> {
        let records = self.fetch(kind).await?;
        if records.is_empty() {
            info!(entity = %kind, "No records to export");
            return Ok(None);
        }

        let name = csv_file_name(&self.config.product, kind, Utc::now());
        let path = self
            .exports
            .write(&name, &csv::encode(&records))
            .await
            .inspect_err(|e| error!(entity = %kind, file = %name, error = %e, "CSV write failed"))?;
        info!(entity = %kind, count = records.len(), path = %path.display(), "CSV exported");
        Ok(Some(path))
    }

    /// Export every non-empty entity kind to CSV.
    pub async fn export_all_csv(&self) -> Result<Vec<PathBuf>, BackupError> {
        let mut paths = Vec::new();
        for kind in EntityKind::ALL {
            if let Some(path) = self.export_csv(kind).await? {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Decode CSV text for import. Fewer than two non-blank lines is an empty file.
    pub fn import_csv(&self, text: &str) -> Result<Vec<Record>, BackupError> {
        if text.lines().filter(|l| !l.trim().is_empty()).count() < 2 {
            warn!(error = %BackupError::EmptyFile, "CSV import rejected");
            return Err(BackupError::EmptyFile);
        }
        let records = csv::decode(text)?;
        info!(count = records.len(), "CSV imported");
        Ok(records)
    }

    /// Read and decode a CSV file from the export directory.
    pub async fn import_csv_file(&self, name: &str) -> Result<Vec<Record>, BackupError> {
        let text = self
            .exports
            .read(name)
            .await
            .inspect_err(|e| error!(file = name, error = %e, "CSV read failed"))?;
        self.import_csv(&text)
    }
}
