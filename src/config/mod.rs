use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::domain::{GiftCardProgram, Policies};
use crate::errors::{BookingError, Result};
use crate::money::CurrencyCode;
use crate::utils::files::{
    parse_timestamp, sanitize_note, write_atomic, BACKUP_EXTENSION, BACKUP_TIMESTAMP_FORMAT,
};
use crate::utils::{ensure_dir, PathResolver};

const DEFAULT_PAY_LINK_BASE: &str = "https://pay.example.com/bookings";

/// Business settings the booking engine runs under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Source of the three-letter booking code prefix.
    pub business_slug: String,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub policies: Policies,
    #[serde(default)]
    pub gift_cards: GiftCardProgram,
    #[serde(default = "EngineConfig::default_pay_link_base_url")]
    pub pay_link_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("business")
    }
}

impl EngineConfig {
    pub fn new(business_slug: impl Into<String>) -> Self {
        Self {
            business_slug: business_slug.into(),
            currency: CurrencyCode::default(),
            policies: Policies::default(),
            gift_cards: GiftCardProgram::default(),
            pay_link_base_url: Self::default_pay_link_base_url(),
        }
    }

    pub fn default_pay_link_base_url() -> String {
        DEFAULT_PAY_LINK_BASE.into()
    }

    pub fn validate(&self) -> Result<()> {
        self.policies.validate()?;
        if self.business_slug.trim().is_empty() {
            return Err(BookingError::Config("business slug must not be empty".into()));
        }
        let currency = self.currency.as_str();
        if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
            return Err(BookingError::Config(format!(
                "currency `{currency}` is not an ISO 4217 code"
            )));
        }
        if self.pay_link_base_url.trim().is_empty() {
            return Err(BookingError::Config("pay link base URL must not be empty".into()));
        }
        Ok(())
    }
}

/// Loads, saves, and snapshots the engine configuration file.
pub struct ConfigManager {
    path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::from_base(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        let backups_dir = PathResolver::config_backup_dir_in(&base);
        ensure_dir(&backups_dir)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            backups_dir,
        })
    }

    /// Reads and validates the config, or returns the default when none exists yet.
    pub fn load(&self) -> Result<EngineConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file; using defaults");
            return Ok(EngineConfig::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: EngineConfig = serde_json::from_str(&data)
            .map_err(|err| BookingError::Config(format!("{}: {err}", self.path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &EngineConfig) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }

    pub fn backup(&self, config: &EngineConfig, note: Option<&str>) -> Result<String> {
        ensure_dir(&self.backups_dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut name = format!("config_{timestamp}");
        if let Some(label) = sanitize_note(note) {
            name.push('_');
            name.push_str(&label);
        }
        name.push_str(&format!(".{BACKUP_EXTENSION}"));
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.backups_dir.join(&name), &json)?;
        Ok(name)
    }

    pub fn restore(&self, backup_name: &str) -> Result<EngineConfig> {
        let path = self.backups_dir.join(backup_name);
        if !path.exists() {
            return Err(BookingError::Storage(format!(
                "configuration backup `{backup_name}` not found"
            )));
        }
        let data = fs::read_to_string(&path)?;
        let config: EngineConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(name.to_string());
            }
        }
        entries.sort_by(|a, b| parse_timestamp(b).cmp(&parse_timestamp(a)).then(b.cmp(a)));
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GiftCardKind;
    use crate::money::FeePolicy;
    use crate::utils::files::tmp_path;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.currency.as_str(), "USD");
    }

    #[test]
    fn save_then_load_keeps_policies_and_program() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let mut config = EngineConfig::new("glow-studio");
        config.policies.no_show = FeePolicy::percent(50.0);
        config.policies.cancellation = FeePolicy::flat(25.0);
        config.gift_cards.enabled = true;
        config.gift_cards.kind = GiftCardKind::Percent;
        manager.save(&config).unwrap();

        assert_eq!(manager.load().unwrap(), config);
        assert!(!tmp_path(manager.path()).exists());
    }

    #[test]
    fn invalid_policy_on_disk_is_rejected() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        fs::write(
            manager.path(),
            r#"{"business_slug":"glow","policies":{"no_show":{"fee_type":"percent","value":-5.0}}}"#,
        )
        .unwrap();
        assert!(matches!(
            manager.load(),
            Err(BookingError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn malformed_currency_is_a_config_error() {
        let mut config = EngineConfig::new("glow");
        config.currency = CurrencyCode("us$".into());
        assert!(matches!(config.validate(), Err(BookingError::Config(_))));
    }

    #[test]
    fn backups_are_named_and_restorable() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let config = EngineConfig::new("glow");
        let name = manager.backup(&config, Some("Before Launch")).unwrap();
        assert!(name.starts_with("config_"));
        assert!(name.ends_with("_before-launch.json"));
        assert_eq!(manager.list_backups().unwrap(), vec![name.clone()]);
        assert_eq!(manager.restore(&name).unwrap(), config);
    }
}
