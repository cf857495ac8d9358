//! Mongo shell binary locating.
//!
//! Resolves the platform path of the shell executable in the following order:
//!
//! 1. `MOSHELL_SHELL_PATH` environment variable (runtime override)
//! 2. `which` lookup on `PATH`
//! 3. Common install locations
//!
//! The override takes precedence to support hosts where the shell lives
//! outside `PATH` (containers, vendored installs).

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Resolves the filesystem path of a shell executable by name.
pub trait BinaryLocator: Send + Sync {
    /// Returns the path to run for `name` (e.g. `mongosh`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShellNotFound`] if no usable binary exists.
    fn locate(&self, name: &str) -> Result<PathBuf>;
}

/// Platform-aware locator backed by the environment and `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLocator;

impl BinaryLocator for SystemLocator {
    fn locate(&self, name: &str) -> Result<PathBuf> {
        if let Ok(override_path) = std::env::var("MOSHELL_SHELL_PATH") {
            let path = PathBuf::from(override_path);
            if path.exists() {
                return Ok(path);
            }
        }

        let candidate = platform_binary_name(name);
        if let Ok(path) = which::which(&candidate) {
            return Ok(path);
        }

        for location in common_locations(&candidate) {
            if location.exists() {
                return Ok(location);
            }
        }

        Err(Error::ShellNotFound)
    }
}

fn platform_binary_name(name: &str) -> String {
    if cfg!(windows) && Path::new(name).extension().is_none() {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn common_locations(binary: &str) -> Vec<PathBuf> {
    #[cfg(not(windows))]
    {
        [
            "/usr/local/bin",
            "/usr/bin",
            "/opt/homebrew/bin",
            "/opt/local/bin",
        ]
        .iter()
        .map(|dir| Path::new(dir).join(binary))
        .collect()
    }

    #[cfg(windows)]
    {
        let mut locations = Vec::new();
        if let Ok(program_files) = std::env::var("ProgramFiles") {
            locations.push(
                Path::new(&program_files)
                    .join("MongoDB")
                    .join("mongosh")
                    .join(binary),
            );
        }
        locations
    }
}
