use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// A person who books appointments, identified across bookings by email or phone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Customer {
    /// Creates a customer from raw contact details, storing normalized email and phone.
    pub fn from_contact(contact: &CustomerContact) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: contact.name.trim().to_string(),
            email: contact.email.as_deref().and_then(normalize_email),
            phone: contact.phone.as_deref().and_then(normalize_phone),
        }
    }

    pub fn matches_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .and_then(normalize_email)
            .is_some_and(|own| own == email)
    }

    pub fn matches_phone(&self, phone: &str) -> bool {
        self.phone
            .as_deref()
            .and_then(normalize_phone)
            .is_some_and(|own| own == phone)
    }
}

impl Identifiable for Customer {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Customer {
    fn display_label(&self) -> String {
        match (&self.email, &self.phone) {
            (Some(email), _) => format!("{} <{}>", self.name, email),
            (None, Some(phone)) => format!("{} ({})", self.name, phone),
            (None, None) => self.name.clone(),
        }
    }
}

/// Contact details captured by the public booking form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerContact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CustomerContact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Lowercases and trims; empty input yields `None`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    (!email.is_empty()).then_some(email)
}

/// Keeps ASCII digits only; input without digits yields `None`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|ch| ch.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_is_normalized_on_creation() {
        let contact = CustomerContact::new(" Ada ")
            .with_email("  Ada@Example.COM ")
            .with_phone("+1 (555) 010-2030");
        let customer = Customer::from_contact(&contact);
        assert_eq!(customer.name, "Ada");
        assert_eq!(customer.email.as_deref(), Some("ada@example.com"));
        assert_eq!(customer.phone.as_deref(), Some("15550102030"));
    }

    #[test]
    fn blank_contact_fields_are_dropped() {
        assert_eq!(normalize_email("   "), None);
        assert_eq!(normalize_phone("n/a"), None);
    }
}
