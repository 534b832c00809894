pub mod hasura_store;
pub mod types;

pub use hasura_store::HasuraGraphStore;
pub use types::{LinkId, NewLink, PackageRecord, TriggerContext, VersionRecord};
