//! Sync engine for calsync.
//!
//! This crate holds everything below the command line:
//! - `upstream` fetches the account and its events from the university calendar
//! - `ics` encodes, parses and UID-merges calendar documents
//! - `store` uploads merged documents to the remote calendar store
//! - `sync` ties one run together, `scheduler` drives runs in the background
//! - `llm` turns free-form text into events through a hosted agent

pub mod config;
pub mod error;
pub mod event;
pub mod http;
pub mod ics;
pub mod llm;
pub mod lock;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod sync;
pub mod time;
pub mod upstream;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use event::Event;
pub use scheduler::{Scheduler, SchedulerEvent, SchedulerHandle, SyncTrigger};
pub use sync::{SyncEngine, SyncOutcome};
