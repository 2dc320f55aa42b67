pub mod protocols;
pub mod statistics;
pub mod issues;

pub use protocols::{Analysis, LayerInfo, reconcile_analyses};
pub use statistics::{Statistics, ProtocolShare, PacketSizeAnalysis, SizeBucket, SizeClass};
pub use issues::{Issue, Severity, severity_breakdown};
