//! Message templates with `{name}` placeholders.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::channel::Channel;

/// Matches a `{name}` placeholder token. A name is any run of characters
/// other than braces and line breaks, so `{pickup-date}` and `{first name}`
/// are placeholders too.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}\r\n]+)\}").expect("valid placeholder regex"));

/// A reusable message body bound to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    pub channel: Channel,
    pub body: String,
    /// Every placeholder in `body` should be listed here.
    pub required_variables: BTreeSet<String>,
}

impl MessageTemplate {
    /// Build a template, declaring the listed variables.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        channel: Channel,
        body: impl Into<String>,
        required_variables: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            channel,
            body: body.into(),
            required_variables: required_variables.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Placeholders used in the body but not declared in `required_variables`.
    pub fn undeclared_placeholders(&self) -> BTreeSet<String> {
        placeholders(&self.body)
            .into_iter()
            .filter(|name| !self.required_variables.contains(name))
            .collect()
    }

    /// Declared variables absent from `variables`.
    pub fn missing_variables(&self, variables: &HashMap<String, String>) -> BTreeSet<String> {
        self.required_variables
            .iter()
            .filter(|name| !variables.contains_key(*name))
            .cloned()
            .collect()
    }
}

/// Names of every `{name}` token in `text`.
pub fn placeholders(text: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Substitute every placeholder in the template body.
///
/// Tokens without a value are left as literal `{name}`. Substitution is a
/// single pass, so values containing braces are never expanded again.
pub fn render(template: &MessageTemplate, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(&template.body, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Placeholders still present in rendered output.
pub fn unresolved_placeholders(rendered: &str) -> BTreeSet<String> {
    placeholders(rendered)
}

/// Templates keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, MessageTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the standard rental-desk templates.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert(MessageTemplate::new(
            "booking_confirmation",
            "Booking confirmation",
            Channel::WhatsApp,
            "Hi {customerName}, your booking for the {carModel} is confirmed. \
             Pickup on {pickupDate} at {location}.",
            &["customerName", "carModel", "pickupDate", "location"],
        ));
        registry.insert(MessageTemplate::new(
            "pickup_reminder",
            "Pickup reminder",
            Channel::Sms,
            "Reminder: {customerName}, your {carModel} is ready for pickup on {pickupDate}.",
            &["customerName", "carModel", "pickupDate"],
        ));
        registry.insert(MessageTemplate::new(
            "return_reminder",
            "Return reminder",
            Channel::Sms,
            "Hi {customerName}, please return the {carModel} by {returnDate}. Thank you!",
            &["customerName", "carModel", "returnDate"],
        ));
        registry.insert(MessageTemplate::new(
            "payment_receipt",
            "Payment receipt",
            Channel::Email,
            "Dear {customerName}, we received your payment of {amount} for booking {bookingId}.",
            &["customerName", "amount", "bookingId"],
        ));
        registry
    }

    /// Insert or replace a template.
    pub fn insert(&mut self, template: MessageTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, id: &str) -> Option<&MessageTemplate> {
        self.templates.get(id)
    }

    /// All templates, sorted by id.
    pub fn list(&self) -> Vec<&MessageTemplate> {
        let mut templates: Vec<_> = self.templates.values().collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn greeting() -> MessageTemplate {
        MessageTemplate::new(
            "greet",
            "Greeting",
            Channel::Sms,
            "Hi {customerName}",
            &["customerName"],
        )
    }

    #[test]
    fn missing_variable_left_verbatim() {
        assert_eq!(render(&greeting(), &HashMap::new()), "Hi {customerName}");
    }

    #[test]
    fn substitutes_every_occurrence() {
        let template = MessageTemplate::new(
            "t",
            "t",
            Channel::Sms,
            "{name}, {name}! Car: {car}",
            &["name", "car"],
        );
        let out = render(&template, &vars(&[("name", "Ana"), ("car", "Yaris")]));
        assert_eq!(out, "Ana, Ana! Car: Yaris");
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let template = TemplateRegistry::with_defaults()
            .get("booking_confirmation")
            .cloned()
            .unwrap();
        let forward = vars(&[
            ("customerName", "Ana"),
            ("carModel", "Golf"),
            ("pickupDate", "2026-10-20"),
            ("location", "Airport"),
        ]);
        let reversed = vars(&[
            ("location", "Airport"),
            ("pickupDate", "2026-10-20"),
            ("carModel", "Golf"),
            ("customerName", "Ana"),
        ]);
        assert_eq!(render(&template, &forward), render(&template, &reversed));
        assert!(unresolved_placeholders(&render(&template, &forward)).is_empty());
    }

    #[test]
    fn values_are_not_reexpanded() {
        let template = MessageTemplate::new("t", "t", Channel::Sms, "{a} {b}", &["a", "b"]);
        let out = render(&template, &vars(&[("a", "{b}"), ("b", "x")]));
        assert_eq!(out, "{b} x");
    }

    #[test]
    fn unresolved_tokens_are_reported() {
        let out = render(&greeting(), &HashMap::new());
        assert_eq!(
            unresolved_placeholders(&out),
            BTreeSet::from(["customerName".to_string()])
        );
    }

    #[test]
    fn renders_names_that_are_not_identifiers() {
        let template = MessageTemplate::new(
            "t",
            "t",
            Channel::Sms,
            "Pickup {pickup-date} / {1st} for {first name}",
            &["pickup-date", "1st", "first name"],
        );
        assert!(template.undeclared_placeholders().is_empty());
        let out = render(
            &template,
            &vars(&[("pickup-date", "Monday"), ("1st", "A"), ("first name", "Ana")]),
        );
        assert_eq!(out, "Pickup Monday / A for Ana");
        assert!(unresolved_placeholders(&out).is_empty());
    }

    #[test]
    fn undeclared_non_identifier_names_detected() {
        let template = MessageTemplate::new("t", "t", Channel::Sms, "{pickup-date} {1st}", &[]);
        assert_eq!(
            template.undeclared_placeholders(),
            BTreeSet::from(["1st".to_string(), "pickup-date".to_string()])
        );
    }

    #[test]
    fn undeclared_placeholders_detected() {
        let template = MessageTemplate::new("t", "t", Channel::Sms, "{a} {b}", &["a"]);
        assert_eq!(template.undeclared_placeholders(), BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn default_templates_declare_all_placeholders() {
        let registry = TemplateRegistry::with_defaults();
        assert_eq!(registry.len(), 4);
        for template in registry.list() {
            assert!(
                template.undeclared_placeholders().is_empty(),
                "{} has undeclared placeholders",
                template.id
            );
        }
    }

    #[test]
    fn missing_variables_lists_absent_names() {
        let template = TemplateRegistry::with_defaults()
            .get("return_reminder")
            .cloned()
            .unwrap();
        let missing = template.missing_variables(&vars(&[("customerName", "Ana")]));
        assert_eq!(
            missing,
            BTreeSet::from(["carModel".to_string(), "returnDate".to_string()])
        );
    }
}
