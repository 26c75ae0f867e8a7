//! Home directory resolution: `~/.turnloop/` (or `$TURNLOOP_HOME`).

use std::io;
use std::path::PathBuf;

/// Global turnloop home directory.
///
/// Holds the capability registry YAML, the readline history file, and the
/// instance config. Sessions themselves are kept in memory only; this CLI
/// has no session store.
#[derive(Debug, Clone)]
pub struct TurnloopHome {
    root: PathBuf,
}

impl TurnloopHome {
    /// Resolve the home directory.
    ///
    /// Checks `$TURNLOOP_HOME` first, then falls back to `$HOME/.turnloop/`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is resolvable.
    pub fn resolve() -> io::Result<Self> {
        let root = if let Ok(custom) = std::env::var("TURNLOOP_HOME") {
            PathBuf::from(custom)
        } else {
            let home = directories::BaseDirs::new()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "could not resolve home directory"))?;
            home.home_dir().join(".turnloop")
        };
        Ok(Self { root })
    }

    /// Create the home directory if it does not already exist.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }

    /// The home directory itself.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Path to the instance config file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    /// Path to the capability registry YAML.
    #[must_use]
    pub fn capabilities_path(&self) -> PathBuf {
        self.root.join("capabilities.yaml")
    }

    /// Path to the readline history file.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.root.join("history")
    }
}
