pub mod filesystem;
pub mod staging;

pub use filesystem::TokioFileSystem;
pub use staging::{StagingWorkspace, UuidGenerator};
