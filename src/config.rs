/// Configuration: TOML-based with sensible defaults.
/// Config file: `~/.config/termcore/config.toml`

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shell: ShellConfig,
    pub cell: CellConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Writable home directory for the child; `$HOME` when unset.
    pub home: Option<String>,
    /// Extra environment (e.g. LD_LIBRARY_PATH, TMUX_TMPDIR) for platforms
    /// where the defaults are not writable.
    pub env: BTreeMap<String, String>,
}

/// Pixel size of one terminal cell, as measured by the renderer's font.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".into()),
            args: Vec::new(),
            home: None,
            env: BTreeMap::new(),
        }
    }
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            width: 12,
            height: 24,
        }
    }
}

impl Config {
    /// Config file path: `~/.config/termcore/config.toml`
    pub fn path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home)
            .join(".config")
            .join("termcore")
            .join("config.toml")
    }

    /// Load config from file, falling back to defaults.
    pub fn load() -> Self {
        match std::fs::read_to_string(Self::path()) {
            Ok(contents) => Self::from_str(&contents),
            Err(_) => Self::default(),
        }
    }

    /// Parse config from a TOML string.
    pub fn from_str(s: &str) -> Self {
        toml::from_str(s).unwrap_or_default()
    }
}
