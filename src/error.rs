//! Error types for rental-ops.

use crate::backup::EntityKind;
use crate::comms::Channel;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures reported by the data-access collaborator.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Data source offline: {0}")]
    Offline(String),
}

/// Backup, restore, and CSV import/export errors.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Data source unavailable while fetching {entity}: {source}")]
    SourceUnavailable {
        entity: EntityKind,
        #[source]
        source: DatabaseError,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Backup structure validation failed")]
    StructuralValidationFailed,

    #[error("File has no data rows")]
    EmptyFile,

    #[error("Unsupported backup version: {0}")]
    UnsupportedVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Provider-level delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("No provider registered for channel {channel}")]
    NoProvider { channel: Channel },

    #[error("Invalid destination for {channel}: {destination}")]
    InvalidDestination { channel: Channel, destination: String },

    #[error("Provider for {channel} rejected the message: {reason}")]
    Rejected { channel: Channel, reason: String },
}

/// Communication-path errors.
#[derive(Debug, thiserror::Error)]
pub enum CommsError {
    #[error("Template {id} not found")]
    TemplateNotFound { id: String },

    #[error("Template {id} targets {channel}, which cannot be routed from a template")]
    UnsupportedChannelForTemplate { id: String, channel: Channel },

    #[error("Delivery to {destination} failed: {source}")]
    ProviderDeliveryFailed {
        destination: String,
        #[source]
        source: ChannelError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_unavailable_names_entity_and_cause() {
        let err = BackupError::SourceUnavailable {
            entity: EntityKind::Bookings,
            source: DatabaseError::Offline("replica down".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("bookings"));
        assert!(msg.contains("replica down"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn delivery_failure_keeps_channel_cause() {
        let err = CommsError::ProviderDeliveryFailed {
            destination: "+351912345678".into(),
            source: ChannelError::NoProvider {
                channel: Channel::WhatsApp,
            },
        };
        assert!(err.to_string().starts_with("Delivery to +351912345678 failed"));
        let cause = std::error::Error::source(&err).unwrap();
        assert!(cause.to_string().contains("No provider registered"));
    }
}
