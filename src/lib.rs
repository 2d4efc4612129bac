pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{LocalStorage, MemoryStorage, SheetListProvider};
pub use config::GuestBookConfig;
pub use crate::core::{
    admin::AdminReport,
    store::{CorruptPolicy, JsonSubmissionStore},
    verifier::{cancel_pair, CancelHandle, CancelSignal, GuestVerifier},
    workflow::{GuestState, GuestView, GuestWorkflow},
};
pub use utils::error::{GuestBookError, LoadError, Result, StoreError, WorkflowError};
