//! Configuration surface consumed by the mirror.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use models::{Peer, Protocol};
use serde::{Deserialize, Serialize};
use sync::SyncSettings;

/// All recognized options, with their stock defaults. Hosts usually load
/// these from a YAML file and override a handful of keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default peer to synchronize from.
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    /// Group blocks into one storage write.
    pub bulk_enable: bool,
    /// Blocks per batch request.
    pub bulk_size: u32,
    /// Cap synchronization for development runs.
    pub dev_mode: bool,
    /// Analyzer for full-text fields of record indices.
    pub string_analyzer: String,
    /// Whether the host should schedule synchronization at all.
    pub sync_enable: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9330,
            protocol: Protocol::Http,
            bulk_enable: true,
            bulk_size: 1000,
            dev_mode: false,
            string_analyzer: "english".to_string(),
            sync_enable: false,
        }
    }
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .with_context(|| format!("opening settings file {}", path.as_ref().display()))?;
        let reader = BufReader::new(file);
        let settings = serde_yaml::from_reader(reader).context("parsing settings file")?;
        Ok(settings)
    }

    /// The configured default peer. Host and port are required.
    pub fn peer(&self) -> Result<Peer> {
        ensure!(!self.host.trim().is_empty(), "node host is required");
        ensure!(self.port > 0, "node port is required");
        Ok(Peer::with_protocol(self.host.clone(), self.port, self.protocol))
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            bulk: self.bulk_enable,
            batch_size: self.bulk_size,
            dev_mode: self.dev_mode,
        }
    }
}
