use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_DIR: &str = ".hexed";
const CONFIG_FILE: &str = "buffer.toml";

pub const DEFAULT_READ_WINDOW: usize = 4096;
pub const DEFAULT_CANCEL_POLL_INTERVAL: usize = 100;
pub const DEFAULT_SCRATCH_POOL_LIMIT: usize = 8;

/// How a file-backed buffer asks for its backing file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OpenMode {
    /// Try read-write first and fall back to read-only when permissions deny it.
    #[default]
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BufferConfig {
    pub open_mode: OpenMode,
    /// Record edits for undo/redo.
    pub track_history: bool,
    /// Size in bytes of the sliding window used when searching across chunks.
    pub read_window: usize,
    /// Number of search iterations between cancellation checks.
    pub cancel_poll_interval: usize,
    /// Maximum number of idle scratch buffers kept for reuse.
    pub scratch_pool_limit: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            open_mode: OpenMode::default(),
            track_history: true,
            read_window: DEFAULT_READ_WINDOW,
            cancel_poll_interval: DEFAULT_CANCEL_POLL_INTERVAL,
            scratch_pool_limit: DEFAULT_SCRATCH_POOL_LIMIT,
        }
    }
}

impl BufferConfig {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = config_path(root);
        let contents = fs::read_to_string(&path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.normalize();
        Ok(config)
    }

    pub fn load_or_default(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(root) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, root: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = config_path(&root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// Replaces zero sizes, which would stall window reads and polling, with defaults.
    pub fn normalize(&mut self) {
        if self.read_window == 0 {
            self.read_window = DEFAULT_READ_WINDOW;
        }
        if self.cancel_poll_interval == 0 {
            self.cancel_poll_interval = DEFAULT_CANCEL_POLL_INTERVAL;
        }
    }

    pub fn read_only(mut self) -> Self {
        self.open_mode = OpenMode::ReadOnly;
        self
    }

    pub fn without_history(mut self) -> Self {
        self.track_history = false;
        self
    }

    pub fn with_read_window(mut self, bytes: usize) -> Self {
        self.read_window = bytes;
        self.normalize();
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse buffer configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize buffer configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub fn config_path(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join(CONFIG_DIR).join(CONFIG_FILE)
}

impl fmt::Display for BufferConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BufferConfig(mode={:?}, history={}, window={})",
            self.open_mode, self.track_history, self.read_window
        )
    }
}
