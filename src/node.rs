//! Two-phase host lifecycle.
//!
//! A [`MirrorHost`] exists before the host's startup completes, while the
//! remote clients are not available yet. [`MirrorHost::ready`] consumes
//! it together with the client handles and produces a [`Mirror`];
//! synchronization is only reachable from there, so "invoked before
//! ready" is unrepresentable instead of being a nullable field.

use std::sync::Arc;

use anyhow::Context;
use models::{Peer, Progression};
use remote::{ChainRemote, HttpRemote, NetworkRemote};
use store::BlockStore;
use sync::SyncService;
use tracing::info;

use crate::history::HistoryService;
use crate::settings::Settings;

/// The mirror before startup completed.
pub struct MirrorHost {
    settings: Settings,
    store: Arc<dyn BlockStore>,
}

impl MirrorHost {
    pub fn new(settings: Settings, store: Arc<dyn BlockStore>) -> Self {
        Self { settings, store }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Finish startup with the stock HTTP remote client.
    pub fn ready_with_http(self) -> anyhow::Result<Mirror> {
        let http = Arc::new(HttpRemote::new().context("building HTTP remote client")?);
        Ok(self.ready(http.clone(), http))
    }

    /// Finish startup with the now-available remote clients.
    pub fn ready(self, chain: Arc<dyn ChainRemote>, network: Arc<dyn NetworkRemote>) -> Mirror {
        let sync = SyncService::new(
            self.store.clone(),
            chain,
            network,
            self.settings.sync_settings(),
        );
        let history = HistoryService::new(self.store, self.settings.string_analyzer.clone());
        info!("mirror ready");
        Mirror {
            settings: self.settings,
            sync,
            history,
        }
    }
}

/// A fully wired mirror.
pub struct Mirror {
    settings: Settings,
    sync: SyncService,
    history: HistoryService,
}

impl Mirror {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sync_service(&self) -> &SyncService {
        &self.sync
    }

    pub fn history(&self) -> &HistoryService {
        &self.history
    }

    /// One synchronization run against the configured default peer.
    pub async fn sync_once(&self, progression: &Progression) -> anyhow::Result<()> {
        let peer = self.settings.peer()?;
        self.sync.sync(&peer, progression).await;
        Ok(())
    }

    /// One synchronization run against an explicit peer.
    pub async fn sync_with(&self, peer: &Peer, progression: &Progression) {
        self.sync.sync(peer, progression).await;
    }
}
