//! Command-line adapter over the booking engine. Each invocation loads the
//! workspace, runs one command, and saves the workspace back when it changed.

pub mod commands;
pub mod output;

use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::errors::BookingError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] BookingError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

/// Where the CLI keeps its config and workspaces.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub base_dir: PathBuf,
    pub workspace: String,
}

impl CliContext {
    pub const DEFAULT_WORKSPACE: &'static str = "default";

    pub fn from_env() -> Self {
        Self {
            base_dir: crate::utils::PathResolver::base_dir(),
            workspace: env::var("BOOKING_CORE_WORKSPACE")
                .unwrap_or_else(|_| Self::DEFAULT_WORKSPACE.to_string()),
        }
    }
}

pub fn run_cli() -> Result<(), CliError> {
    let args: Vec<String> = env::args().skip(1).collect();
    commands::dispatch(&CliContext::from_env(), &args)
}
