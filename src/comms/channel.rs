//! Communication channels and their per-message cost.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A communication medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    WhatsApp,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Self::Sms, Self::WhatsApp, Self::Email];

    /// Fixed cost charged per dispatched message.
    pub fn unit_cost(&self) -> Decimal {
        match self {
            Self::Sms => dec!(0.05),
            Self::WhatsApp => dec!(0.08),
            Self::Email => dec!(0.10),
        }
    }

    /// Whether a template declaring this channel can be routed by `send_templated`.
    pub fn is_template_routable(&self) -> bool {
        matches!(self, Self::Sms | Self::WhatsApp)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sms => write!(f, "sms"),
            Self::WhatsApp => write!(f, "whatsapp"),
            Self::Email => write!(f, "email"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::WhatsApp),
            "email" => Ok(Self::Email),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}
