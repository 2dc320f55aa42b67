pub mod health;

pub use health::{ConnectionState, ConnectivityMonitor, ProbeScheduler};
