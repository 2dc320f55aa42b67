pub mod settings;

pub use settings::{Config, BackendConfig, MonitorConfig, CaptureConfig, StorageConfig};
