//! Channel dispatcher: sends one message through one channel's provider and
//! appends the outcome to the dispatch log.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::channel::Channel;
use super::provider::{
    DeliveryOutcome, DeliveryProvider, EmailProvider, SmsProvider, WhatsAppProvider,
};
use super::template::{self, TemplateRegistry};
use crate::backup::record::{Record, stringify};
use crate::config::CommsConfig;
use crate::error::{ChannelError, CommsError, ConfigError};

/// Delivery status of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Provider queued the message; outcome not yet known.
    Pending,
    /// Provider accepted the message.
    Sent,
    /// Provider confirmed receipt. Reserved for receipt callbacks.
    Delivered,
    /// Provider refused or could not be reached.
    Failed,
}

impl From<DeliveryOutcome> for DispatchStatus {
    fn from(outcome: DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Accepted => Self::Sent,
            DeliveryOutcome::Queued => Self::Pending,
        }
    }
}

/// Who a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Phone number or email address, depending on channel.
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Recipient {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            id: None,
            name: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build a recipient from a customer record, addressed by the string in
    /// `destination_field`. Returns `None` when that field is absent, not a
    /// string, or blank.
    pub fn from_record(record: &Record, destination_field: &str) -> Option<Self> {
        let destination = record.get(destination_field)?.as_str()?.trim();
        if destination.is_empty() {
            return None;
        }
        let mut recipient = Self::new(destination);
        if let Some(id) = record.get("id").filter(|id| !id.is_null()) {
            recipient = recipient.with_id(stringify(id));
        }
        if let Some(name) = record.get("name").and_then(|n| n.as_str()) {
            recipient = recipient.with_name(name);
        }
        Some(recipient)
    }
}

/// One dispatch attempt. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    pub destination: String,
    pub channel: Channel,
    pub rendered_message: String,
    pub status: DispatchStatus,
    pub timestamp: DateTime<Utc>,
    /// Unit cost charged; absent for failed dispatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl DispatchRecord {
    /// Whether the dispatch counts as a success for tallying.
    pub fn is_success(&self) -> bool {
        self.status != DispatchStatus::Failed
    }
}

/// Aggregate figures over the dispatch log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommsStats {
    pub total: usize,
    pub sent: usize,
    pub delivered: usize,
    pub pending: usize,
    pub failed: usize,
    pub total_cost: Decimal,
    pub by_channel: BTreeMap<Channel, usize>,
}

/// Append-only log of dispatch records, in dispatch order.
#[derive(Debug, Default)]
pub struct DispatchLog {
    records: RwLock<Vec<DispatchRecord>>,
}

impl DispatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    async fn append(&self, record: DispatchRecord) {
        self.records.write().await.push(record);
    }

    /// Every record, oldest first.
    pub async fn entries(&self) -> Vec<DispatchRecord> {
        self.records.read().await.clone()
    }

    /// Records addressed to one recipient id, oldest first.
    pub async fn for_recipient(&self, recipient_id: &str) -> Vec<DispatchRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.recipient_id.as_deref() == Some(recipient_id))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Totals by status and channel, plus summed cost.
    pub async fn stats(&self) -> CommsStats {
        let records = self.records.read().await;
        let mut stats = CommsStats {
            total: records.len(),
            ..Default::default()
        };
        for record in records.iter() {
            match record.status {
                DispatchStatus::Sent => stats.sent += 1,
                DispatchStatus::Delivered => stats.delivered += 1,
                DispatchStatus::Pending => stats.pending += 1,
                DispatchStatus::Failed => stats.failed += 1,
            }
            stats.total_cost += record.cost.unwrap_or_default();
            *stats.by_channel.entry(record.channel).or_default() += 1;
        }
        stats
    }
}

/// Routes messages to per-channel providers and records every attempt.
pub struct ChannelDispatcher {
    providers: HashMap<Channel, Arc<dyn DeliveryProvider>>,
    templates: TemplateRegistry,
    log: DispatchLog,
}

impl ChannelDispatcher {
    /// A dispatcher with no providers registered.
    pub fn new(templates: TemplateRegistry) -> Self {
        Self {
            providers: HashMap::new(),
            templates,
            log: DispatchLog::new(),
        }
    }

    /// A dispatcher wired to the built-in SMS, WhatsApp, and email providers.
    pub fn with_default_providers(
        templates: TemplateRegistry,
        config: &CommsConfig,
    ) -> Result<Self, ConfigError> {
        let email = EmailProvider::new(&config.email_from)?;
        Ok(Self::new(templates)
            .with_provider(Arc::new(SmsProvider))
            .with_provider(Arc::new(WhatsAppProvider))
            .with_provider(Arc::new(email)))
    }

    /// Register (or replace) the provider for its channel.
    pub fn with_provider(mut self, provider: Arc<dyn DeliveryProvider>) -> Self {
        self.providers.insert(provider.channel(), provider);
        self
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn log(&self) -> &DispatchLog {
        &self.log
    }

    /// Send `message` to one recipient. Delivery failures are recorded,
    /// never returned as errors.
    pub async fn send(
        &self,
        channel: Channel,
        recipient: &Recipient,
        message: &str,
    ) -> DispatchRecord {
        let result = match self.providers.get(&channel) {
            Some(provider) => provider.deliver(&recipient.destination, message).await,
            None => Err(ChannelError::NoProvider { channel }),
        };

        let (status, cost, failure_reason) = match result {
            Ok(outcome) => (DispatchStatus::from(outcome), Some(channel.unit_cost()), None),
            Err(source) => {
                let reason = source.to_string();
                let err = CommsError::ProviderDeliveryFailed {
                    destination: recipient.destination.clone(),
                    source,
                };
                warn!(%channel, error = %err, "Dispatch failed");
                (DispatchStatus::Failed, None, Some(reason))
            }
        };

        let record = DispatchRecord {
            id: Uuid::new_v4(),
            recipient_id: recipient.id.clone(),
            recipient_name: recipient.name.clone(),
            destination: recipient.destination.clone(),
            channel,
            rendered_message: message.to_string(),
            status,
            timestamp: Utc::now(),
            cost,
            failure_reason,
        };
        debug!(dispatch_id = %record.id, %channel, status = ?record.status, "Dispatch recorded");
        self.log.append(record.clone()).await;
        record
    }

    /// Render a stored template and send it on the template's channel.
    ///
    /// Returns `Ok(false)` when delivery fails or the template targets a
    /// channel that cannot be routed from a template (email). An unknown
    /// template id is an error.
    pub async fn send_templated(
        &self,
        template_id: &str,
        recipient: &Recipient,
        variables: &HashMap<String, String>,
    ) -> Result<bool, CommsError> {
        let template = self.templates.get(template_id).ok_or_else(|| {
            let err = CommsError::TemplateNotFound {
                id: template_id.to_string(),
            };
            warn!(error = %err, "Templated send rejected");
            err
        })?;

        if !template.channel.is_template_routable() {
            let err = CommsError::UnsupportedChannelForTemplate {
                id: template.id.clone(),
                channel: template.channel,
            };
            warn!(error = %err, "Templated send skipped");
            return Ok(false);
        }

        let rendered = template::render(template, variables);
        let unresolved = template::unresolved_placeholders(&rendered);
        if !unresolved.is_empty() {
            warn!(
                template = template_id,
                ?unresolved,
                "Rendered message has unresolved placeholders"
            );
        }

        let record = self.send(template.channel, recipient, &rendered).await;
        info!(template = template_id, status = ?record.status, "Templated message dispatched");
        Ok(record.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::comms::template::MessageTemplate;

    struct QueueingProvider;

    #[async_trait::async_trait]
    impl DeliveryProvider for QueueingProvider {
        fn channel(&self) -> Channel {
            Channel::WhatsApp
        }
        async fn deliver(&self, _: &str, _: &str) -> Result<DeliveryOutcome, ChannelError> {
            Ok(DeliveryOutcome::Queued)
        }
    }

    fn dispatcher() -> ChannelDispatcher {
        ChannelDispatcher::with_default_providers(
            TemplateRegistry::with_defaults(),
            &CommsConfig::default(),
        )
        .unwrap()
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn recipient_from_record_keeps_ids_unquoted() {
        let record: Record = serde_json::from_str(
            r#"{"id": "7", "name": "Ana Silva", "phone": "+351912345678"}"#,
        )
        .unwrap();
        let recipient = Recipient::from_record(&record, "phone").unwrap();
        assert_eq!(recipient.id.as_deref(), Some("7"));
        assert_eq!(recipient.name.as_deref(), Some("Ana Silva"));
        assert_eq!(recipient.destination, "+351912345678");

        let numeric: Record =
            serde_json::from_str(r#"{"id": 1, "email": "ana@example.com"}"#).unwrap();
        let recipient = Recipient::from_record(&numeric, "email").unwrap();
        assert_eq!(recipient.id.as_deref(), Some("1"));
        assert_eq!(recipient.name, None);
    }

    #[test]
    fn recipient_from_record_needs_a_destination() {
        let record: Record = serde_json::from_str(r#"{"id": 2, "phone": "  "}"#).unwrap();
        assert!(Recipient::from_record(&record, "phone").is_none());
        assert!(Recipient::from_record(&record, "email").is_none());
    }

    #[tokio::test]
    async fn send_success_records_cost() {
        let d = dispatcher();
        let recipient = Recipient::new("+351912345678").with_id("c1").with_name("Ana");
        let record = d.send(Channel::Sms, &recipient, "Hello").await;

        assert_eq!(record.status, DispatchStatus::Sent);
        assert_eq!(record.cost, Some(dec!(0.05)));
        assert_eq!(record.recipient_id.as_deref(), Some("c1"));
        assert_eq!(record.recipient_name.as_deref(), Some("Ana"));
        assert_eq!(d.log().entries().await, vec![record]);
    }

    #[tokio::test]
    async fn send_failure_is_recorded_not_raised() {
        let d = dispatcher();
        let record = d.send(Channel::Email, &Recipient::new("not-an-address"), "Hi").await;

        assert_eq!(record.status, DispatchStatus::Failed);
        assert!(record.cost.is_none());
        assert!(record.failure_reason.unwrap().contains("Invalid destination"));
        assert_eq!(d.log().len().await, 1);
    }

    #[tokio::test]
    async fn send_without_provider_fails() {
        let d = ChannelDispatcher::new(TemplateRegistry::new());
        let record = d.send(Channel::Sms, &Recipient::new("+351912345678"), "Hi").await;
        assert_eq!(record.status, DispatchStatus::Failed);
    }

    #[tokio::test]
    async fn queued_delivery_is_pending() {
        let d = ChannelDispatcher::new(TemplateRegistry::new())
            .with_provider(Arc::new(QueueingProvider));
        let record = d.send(Channel::WhatsApp, &Recipient::new("+351912345678"), "Hi").await;
        assert_eq!(record.status, DispatchStatus::Pending);
        assert!(record.is_success());
        assert_eq!(d.log().stats().await.pending, 1);
    }

    #[tokio::test]
    async fn send_templated_renders_and_routes() {
        let d = dispatcher();
        let ok = d
            .send_templated(
                "pickup_reminder",
                &Recipient::new("+351912345678").with_id("c1"),
                &vars(&[
                    ("customerName", "Ana"),
                    ("carModel", "Yaris"),
                    ("pickupDate", "Monday"),
                ]),
            )
            .await
            .unwrap();
        assert!(ok);

        let entries = d.log().entries().await;
        assert_eq!(entries[0].channel, Channel::Sms);
        assert_eq!(
            entries[0].rendered_message,
            "Reminder: Ana, your Yaris is ready for pickup on Monday."
        );
    }

    #[tokio::test]
    async fn send_templated_unknown_id_is_error() {
        let d = dispatcher();
        let err = d
            .send_templated("nope", &Recipient::new("+351912345678"), &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommsError::TemplateNotFound { id } if id == "nope"));
        assert!(d.log().is_empty().await);
    }

    #[tokio::test]
    async fn send_templated_email_is_unsupported() {
        let d = dispatcher();
        let ok = d
            .send_templated("payment_receipt", &Recipient::new("ana@example.com"), &HashMap::new())
            .await
            .unwrap();
        assert!(!ok);
        assert!(d.log().is_empty().await);
    }

    #[tokio::test]
    async fn send_templated_delivery_failure_returns_false() {
        let mut templates = TemplateRegistry::new();
        templates.insert(MessageTemplate::new("t", "t", Channel::Sms, "Hi {name}", &["name"]));
        let d = ChannelDispatcher::new(templates).with_provider(Arc::new(SmsProvider));
        let ok = d
            .send_templated("t", &Recipient::new("bogus"), &vars(&[("name", "Ana")]))
            .await
            .unwrap();
        assert!(!ok);
        assert_eq!(d.log().stats().await.failed, 1);
    }

    #[tokio::test]
    async fn stats_and_recipient_filter() {
        let d = dispatcher();
        d.send(Channel::Sms, &Recipient::new("+351912345678").with_id("a"), "1").await;
        d.send(Channel::WhatsApp, &Recipient::new("+351912345678").with_id("b"), "2").await;
        d.send(Channel::Email, &Recipient::new("x@example.com").with_id("a"), "3").await;
        d.send(Channel::Email, &Recipient::new("broken").with_id("a"), "4").await;

        let stats = d.log().stats().await;
        assert_eq!(stats.total, 4);
        assert_eq!(stats.sent, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_cost, dec!(0.23));
        assert_eq!(stats.by_channel[&Channel::Email], 2);

        let for_a = d.log().for_recipient("a").await;
        let messages: Vec<&str> = for_a.iter().map(|r| r.rendered_message.as_str()).collect();
        assert_eq!(messages, vec!["1", "3", "4"]);
    }
}
