pub mod manager;
pub mod record;

pub use manager::CaptureStorage;
pub use record::{StorageFormat, StoredCaptureRecord};
