//! Host-facing wiring for the ledger mirror.
//!
//! The engine itself lives in the member crates (`models`, `store`,
//! `remote`, `sync`); this crate ties them together for a host service:
//! the configuration surface, the two-phase ready lifecycle, and the
//! deletion-history service. There is no binary: the mirror is invoked
//! programmatically.

pub mod history;
pub mod node;
pub mod settings;

pub use history::{DeleteRecord, HistoryService};
pub use node::{Mirror, MirrorHost};
pub use settings::Settings;

pub use models::{Block, Peer, Progression, RunStatus};
