//! Backend core for the FM26 stadium modding companion.
//!
//! Locates a Football Manager 2026 installation, installs the BepInEx
//! plugin-loader pack, edits the injection plugins' configuration files,
//! maintains the team-to-asset mapping tables and reads the plugin log.
//! Downloads run through a single-flight, cancellable [`TransferManager`];
//! every editable file runs through an [`EditableResource`] session with
//! explicit save/revert semantics.
//!
//! [`TransferManager`]: services::TransferManager
//! [`EditableResource`]: services::EditableResource

pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod settings;
pub mod utils;

pub use errors::{CompanionError, Result};
