//! Backup, restore, and CSV import/export of the rental dataset.

pub mod csv;
pub mod manager;
pub mod record;
pub mod snapshot;
pub mod source;

pub use manager::BackupManager;
pub use record::{EntityKind, Record};
pub use snapshot::{RestoreReport, Snapshot};
pub use source::{DataSource, InMemoryDataSource};
