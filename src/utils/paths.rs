use dirs::home_dir;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::errors::Result;

const HOME_ENV: &str = "BOOKING_CORE_HOME";
const DEFAULT_DIR_NAME: &str = ".booking_core";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const CONFIG_BACKUP_DIR: &str = "config_backups";
const WORKSPACE_DIR: &str = "workspaces";
const BACKUP_DIR: &str = "backups";

/// Resolves every on-disk location relative to one base directory.
pub struct PathResolver;

impl PathResolver {
    /// `$BOOKING_CORE_HOME`, falling back to `~/.booking_core`.
    pub fn base_dir() -> PathBuf {
        if let Some(custom) = env::var_os(HOME_ENV) {
            return PathBuf::from(custom);
        }
        home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DIR_NAME)
    }

    pub fn resolve_base(custom: Option<PathBuf>) -> PathBuf {
        custom.unwrap_or_else(Self::base_dir)
    }

    pub fn config_dir_in(base: &Path) -> PathBuf {
        base.join(CONFIG_DIR)
    }

    pub fn config_file_in(base: &Path) -> PathBuf {
        Self::config_dir_in(base).join(CONFIG_FILE)
    }

    pub fn config_backup_dir_in(base: &Path) -> PathBuf {
        base.join(CONFIG_BACKUP_DIR)
    }

    pub fn workspace_dir_in(base: &Path) -> PathBuf {
        base.join(WORKSPACE_DIR)
    }

    pub fn backup_dir_in(base: &Path) -> PathBuf {
        base.join(BACKUP_DIR)
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_the_base() {
        let base = Path::new("/srv/booking");
        assert_eq!(
            PathResolver::config_file_in(base),
            PathBuf::from("/srv/booking/config/config.json")
        );
        assert_eq!(
            PathResolver::workspace_dir_in(base),
            PathBuf::from("/srv/booking/workspaces")
        );
    }

    #[test]
    fn explicit_base_wins() {
        let custom = PathBuf::from("/tmp/elsewhere");
        assert_eq!(PathResolver::resolve_base(Some(custom.clone())), custom);
    }
}
