//! Delivery providers, one per channel. These stand in for the real SMS,
//! WhatsApp, and email gateways: they validate the destination, build the
//! outgoing payload, and log it without any network I/O.

use async_trait::async_trait;
use lettre::Message;
use lettre::message::Mailbox;
use tracing::{debug, info};

use super::channel::Channel;
use crate::error::{ChannelError, ConfigError};

/// What a provider reports for an accepted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handed to the carrier; no receipt will follow.
    Accepted,
    /// Queued by the provider; final delivery is reported later.
    Queued,
}

/// A gateway capable of delivering content on one channel.
///
/// Providers are treated as unreliable; the dispatcher never retries.
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// Channel this provider serves.
    fn channel(&self) -> Channel;

    /// Attempt delivery of `content` to `destination`.
    async fn deliver(&self, destination: &str, content: &str)
    -> Result<DeliveryOutcome, ChannelError>;
}

/// Strip formatting from a phone number and check it looks like E.164.
///
/// Returns the normalized `+<digits>` / `<digits>` form.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };
    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}{}", plus, digits))
}

/// Mock SMS gateway.
#[derive(Debug, Default)]
pub struct SmsProvider;

#[async_trait]
impl DeliveryProvider for SmsProvider {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn deliver(
        &self,
        destination: &str,
        content: &str,
    ) -> Result<DeliveryOutcome, ChannelError> {
        let number = normalize_phone(destination).ok_or_else(|| ChannelError::InvalidDestination {
            channel: Channel::Sms,
            destination: destination.to_string(),
        })?;
        // 160 GSM-7 characters per segment
        let segments = content.chars().count().div_ceil(160).max(1);
        info!(to = %number, segments, "SMS sent");
        Ok(DeliveryOutcome::Accepted)
    }
}

/// Mock WhatsApp Business gateway.
#[derive(Debug, Default)]
pub struct WhatsAppProvider;

#[async_trait]
impl DeliveryProvider for WhatsAppProvider {
    fn channel(&self) -> Channel {
        Channel::WhatsApp
    }

    async fn deliver(
        &self,
        destination: &str,
        content: &str,
    ) -> Result<DeliveryOutcome, ChannelError> {
        let number = normalize_phone(destination).ok_or_else(|| ChannelError::InvalidDestination {
            channel: Channel::WhatsApp,
            destination: destination.to_string(),
        })?;
        if content.trim().is_empty() {
            return Err(ChannelError::Rejected {
                channel: Channel::WhatsApp,
                reason: "empty message body".to_string(),
            });
        }
        info!(to = %number, chars = content.chars().count(), "WhatsApp message sent");
        Ok(DeliveryOutcome::Accepted)
    }
}

/// Mock email gateway. Messages are fully built with `lettre` but not transported.
#[derive(Debug)]
pub struct EmailProvider {
    from: Mailbox,
    subject: String,
}

impl EmailProvider {
    /// Create a provider sending from `from` (e.g. `"Desk <desk@example.com>"`).
    pub fn new(from: &str) -> Result<Self, ConfigError> {
        let from = from.parse::<Mailbox>().map_err(|e| ConfigError::InvalidValue {
            key: "email_from".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            from,
            subject: "Your rental".to_string(),
        })
    }
}

#[async_trait]
impl DeliveryProvider for EmailProvider {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn deliver(
        &self,
        destination: &str,
        content: &str,
    ) -> Result<DeliveryOutcome, ChannelError> {
        let to = destination
            .trim()
            .parse::<Mailbox>()
            .map_err(|_| ChannelError::InvalidDestination {
                channel: Channel::Email,
                destination: destination.to_string(),
            })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(self.subject.as_str())
            .body(content.to_string())
            .map_err(|e| ChannelError::Rejected {
                channel: Channel::Email,
                reason: e.to_string(),
            })?;

        debug!(bytes = message.formatted().len(), "Email built");
        info!(to = %destination.trim(), "Email sent");
        Ok(DeliveryOutcome::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_phone_accepts_formatted_numbers() {
        assert_eq!(normalize_phone("+351 912-345-678").as_deref(), Some("+351912345678"));
        assert_eq!(normalize_phone("(020) 7946 0958").as_deref(), Some("02079460958"));
    }

    #[test]
    fn normalize_phone_rejects_garbage() {
        assert!(normalize_phone("").is_none());
        assert!(normalize_phone("12345").is_none());
        assert!(normalize_phone("+44 abc 1234567").is_none());
        assert!(normalize_phone("ana@example.com").is_none());
    }

    #[tokio::test]
    async fn sms_rejects_invalid_number() {
        let err = SmsProvider.deliver("not-a-number", "hi").await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidDestination { channel: Channel::Sms, .. }));
        assert_eq!(
            SmsProvider.deliver("+351912345678", "hi").await.unwrap(),
            DeliveryOutcome::Accepted
        );
    }

    #[tokio::test]
    async fn whatsapp_rejects_empty_body() {
        let err = WhatsAppProvider.deliver("+351912345678", "  ").await.unwrap_err();
        assert!(matches!(err, ChannelError::Rejected { .. }));
    }

    #[tokio::test]
    async fn email_validates_mailboxes() {
        let provider = EmailProvider::new("Desk <desk@rental.example>").unwrap();
        assert_eq!(
            provider.deliver("ana@example.com", "Receipt").await.unwrap(),
            DeliveryOutcome::Accepted
        );
        assert!(provider.deliver("+351912345678", "Receipt").await.is_err());
    }

    #[test]
    fn email_provider_rejects_bad_sender() {
        assert!(EmailProvider::new("nobody").is_err());
    }
}
