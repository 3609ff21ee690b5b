//! Service catalog and staff directory collaborators.

use serde::{Deserialize, Serialize};

use crate::money::Cents;

/// A bookable offering with its list price and length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub category: String,
    pub duration_minutes: u32,
    pub price_cents: Cents,
}

impl Service {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        duration_minutes: u32,
        price_cents: Cents,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            duration_minutes,
            price_cents,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaffMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl StaffMember {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Resolves service ids to their catalog entry.
pub trait ServiceCatalog: Send + Sync {
    fn service(&self, id: &str) -> Option<Service>;
}

/// Resolves staff ids to directory entries.
pub trait StaffDirectory: Send + Sync {
    fn staff_member(&self, id: &str) -> Option<StaffMember>;
}

/// In-memory catalog serving both lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
}

impl Catalog {
    pub fn new(services: Vec<Service>, staff: Vec<StaffMember>) -> Self {
        Self { services, staff }
    }

    pub fn add_service(&mut self, service: Service) {
        self.services.retain(|existing| existing.id != service.id);
        self.services.push(service);
    }

    pub fn add_staff(&mut self, member: StaffMember) {
        self.staff.retain(|existing| existing.id != member.id);
        self.staff.push(member);
    }
}

impl ServiceCatalog for Catalog {
    fn service(&self, id: &str) -> Option<Service> {
        self.services.iter().find(|service| service.id == id).cloned()
    }
}

impl StaffDirectory for Catalog {
    fn staff_member(&self, id: &str) -> Option<StaffMember> {
        self.staff.iter().find(|member| member.id == id).cloned()
    }
}
