pub mod store;

pub use store::{CaptureSession, SessionSnapshot, SessionStore, SessionWriter, TabAvailability};
