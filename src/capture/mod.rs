pub mod packet;
pub mod orchestrator;

pub use packet::{Packet, CaptureMode, CaptureRequest, ensure_unique_numbers};
pub use orchestrator::CaptureOrchestrator;
