use chrono::Utc;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    errors::{BookingError, Result},
    utils::{
        ensure_dir,
        files::{
            parse_timestamp, sanitize_note, write_atomic, BACKUP_EXTENSION,
            BACKUP_TIMESTAMP_FORMAT,
        },
        PathResolver,
    },
};

use super::{StorageBackend, Workspace, WORKSPACE_SCHEMA_VERSION};

const DEFAULT_RETENTION: usize = 5;

/// Pretty-printed JSON workspaces under `<base>/workspaces`, with timestamped
/// backups under `<base>/backups/<name>`.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
    workspaces_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let root = PathResolver::resolve_base(root);
        ensure_dir(&root)?;
        let workspaces_dir = PathResolver::workspace_dir_in(&root);
        let backups_dir = PathResolver::backup_dir_in(&root);
        ensure_dir(&workspaces_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root,
            workspaces_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn workspace_path(&self, name: &str) -> PathBuf {
        self.workspaces_dir
            .join(format!("{}.{BACKUP_EXTENSION}", canonical_name(name)))
    }

    pub fn backup_path(&self, name: &str, backup_name: &str) -> PathBuf {
        self.backup_dir(name).join(backup_name)
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    fn backup_file_name(&self, name: &str, note: Option<&str>) -> String {
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut stem = format!("{}_{timestamp}", canonical_name(name));
        if let Some(label) = sanitize_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        format!("{stem}.{BACKUP_EXTENSION}")
    }

    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        fs::copy(path, dir.join(self.backup_file_name(name, None)))?;
        self.prune_backups(name)
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        let backups = self.list_backups(name)?;
        for entry in backups.iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(self.backup_path(name, entry)) {
                warn!(backup = %entry, "failed to prune workspace backup: {err}");
            }
        }
        Ok(())
    }
}

impl StorageBackend for JsonStorage {
    fn save(&self, workspace: &Workspace, name: &str) -> Result<()> {
        let path = self.workspace_path(name);
        self.backup_existing_file(name, &path)?;
        save_workspace_to_path(workspace, &path)?;
        info!(
            workspace = %canonical_name(name),
            bookings = workspace.bookings.len(),
            "workspace saved"
        );
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Workspace> {
        let path = self.workspace_path(name);
        if !path.exists() {
            return Err(BookingError::NotFound(format!(
                "workspace `{}`",
                canonical_name(name)
            )));
        }
        load_workspace_from_path(&path)
    }

    fn exists(&self, name: &str) -> bool {
        self.workspace_path(name).exists()
    }

    fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(file_name.to_string());
            }
        }
        entries.sort_by(|a, b| parse_timestamp(b).cmp(&parse_timestamp(a)).then(b.cmp(a)));
        Ok(entries)
    }

    fn backup(&self, workspace: &Workspace, name: &str, note: Option<&str>) -> Result<String> {
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let file_name = self.backup_file_name(name, note);
        let json = serde_json::to_string_pretty(workspace)?;
        write_atomic(&dir.join(&file_name), &json)?;
        self.prune_backups(name)?;
        Ok(file_name)
    }

    fn restore(&self, name: &str, backup_name: &str) -> Result<Workspace> {
        let backup_path = self.backup_path(name, backup_name);
        if !backup_path.exists() {
            return Err(BookingError::Storage(format!(
                "backup `{backup_name}` not found"
            )));
        }
        let workspace = load_workspace_from_path(&backup_path)?;
        let target = self.workspace_path(name);
        fs::copy(&backup_path, &target)?;
        Ok(workspace)
    }
}

pub fn save_workspace_to_path(workspace: &Workspace, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(workspace)?;
    write_atomic(path, &json)
}

/// Reads a workspace and rejects documents from a newer schema.
pub fn load_workspace_from_path(path: &Path) -> Result<Workspace> {
    let data = fs::read_to_string(path)?;
    let workspace: Workspace = serde_json::from_str(&data)?;
    if workspace.schema_version > WORKSPACE_SCHEMA_VERSION {
        return Err(BookingError::Storage(format!(
            "workspace schema v{} is newer than supported v{}",
            workspace.schema_version, WORKSPACE_SCHEMA_VERSION
        )));
    }
    for warning in workspace_warnings(&workspace) {
        warn!(path = %path.display(), "{warning}");
    }
    Ok(workspace)
}

/// Structural oddities worth reporting that do not prevent loading.
pub fn workspace_warnings(workspace: &Workspace) -> Vec<String> {
    let service_ids: HashSet<_> = workspace.catalog.services.iter().map(|s| &s.id).collect();
    let mut codes = HashSet::new();
    let mut warnings = Vec::new();
    for booking in &workspace.bookings {
        if !codes.insert(booking.code.as_str()) {
            warnings.push(format!("booking code {} appears more than once", booking.code));
        }
        if !service_ids.contains(&booking.service.id) {
            warnings.push(format!(
                "booking {} references unknown service {}",
                booking.code, booking.service.id
            ));
        }
        if booking.authorization().is_none() {
            warnings.push(format!(
                "booking {} has no authorization payment",
                booking.code
            ));
        }
    }
    warnings
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "workspace".into()
    } else {
        sanitized
    }
}
