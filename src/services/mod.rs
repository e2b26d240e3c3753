pub mod configs;
pub mod install;
pub mod logs;
pub mod mappings;
pub mod session;
pub mod transfer;

pub use configs::{AdboardsConfigStore, AudioConfigStore, CrowdConfigStore, StadiumConfigStore};
pub use mappings::{AudioMappingStore, TeamMappingStore};
pub use session::{
    any_dirty, revert_all, save_all, EditableResource, ResourceStore, SaveAllReport, Session,
};
pub use transfer::{TransferManager, TransferPhase, TransferProgress, TransferSnapshot};
