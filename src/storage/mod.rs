pub mod json_backend;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::StoreSnapshot;
use crate::domain::{Booking, Catalog, GiftCardLedgerEntry};
use crate::errors::Result;

pub const WORKSPACE_SCHEMA_VERSION: u8 = 1;

/// Everything needed to bring a booking engine back up: catalog plus store state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workspace {
    #[serde(default = "Workspace::schema_version_default")]
    pub schema_version: u8,
    #[serde(default)]
    pub catalog: Catalog,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub gift_card_entries: Vec<GiftCardLedgerEntry>,
    /// Next booking code sequence; never behind the codes already issued.
    #[serde(default)]
    pub next_sequence: u64,
}

impl Workspace {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            schema_version: WORKSPACE_SCHEMA_VERSION,
            catalog,
            ..Self::default()
        }
    }

    pub fn schema_version_default() -> u8 {
        WORKSPACE_SCHEMA_VERSION
    }

    pub fn from_snapshot(catalog: Catalog, snapshot: StoreSnapshot) -> Self {
        Self {
            schema_version: WORKSPACE_SCHEMA_VERSION,
            catalog,
            bookings: snapshot.bookings,
            gift_card_entries: snapshot.gift_card_entries,
            next_sequence: snapshot.next_sequence,
        }
    }

    /// Splits the document into the catalog and the store state.
    pub fn into_parts(self) -> (Catalog, StoreSnapshot) {
        (
            self.catalog,
            StoreSnapshot {
                bookings: self.bookings,
                gift_card_entries: self.gift_card_entries,
                next_sequence: self.next_sequence,
            },
        )
    }
}

/// Abstraction over persistence backends capable of storing workspaces and backups.
pub trait StorageBackend: Send + Sync {
    fn save(&self, workspace: &Workspace, name: &str) -> Result<()>;
    fn load(&self, name: &str) -> Result<Workspace>;
    fn exists(&self, name: &str) -> bool;
    fn list_backups(&self, name: &str) -> Result<Vec<String>>;
    fn backup(&self, workspace: &Workspace, name: &str, note: Option<&str>) -> Result<String>;
    fn restore(&self, name: &str, backup_name: &str) -> Result<Workspace>;

    fn save_to_path(&self, workspace: &Workspace, path: &Path) -> Result<()> {
        json_backend::save_workspace_to_path(workspace, path)
    }

    fn load_from_path(&self, path: &Path) -> Result<Workspace> {
        json_backend::load_workspace_from_path(path)
    }
}

pub use json_backend::JsonStorage;
