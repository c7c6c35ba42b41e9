//! Templated customer communication over SMS, WhatsApp, and email.

pub mod bulk;
pub mod channel;
pub mod dispatcher;
pub mod provider;
pub mod template;

pub use bulk::{BulkDispatchResult, BulkDispatcher};
pub use channel::Channel;
pub use dispatcher::{ChannelDispatcher, DispatchLog, DispatchRecord, DispatchStatus, Recipient};
pub use provider::{DeliveryOutcome, DeliveryProvider};
pub use template::{MessageTemplate, TemplateRegistry};
