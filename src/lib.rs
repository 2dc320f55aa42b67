// Library exports for packet-analyzer
pub mod analysis;
pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod filter;
pub mod monitor;
pub mod session;
pub mod storage;
pub mod ui;
pub mod utils;

pub use analysis::{issues, protocols, statistics};
pub use capture::{orchestrator, packet};
pub use config::settings;
pub use ui::app;
pub use utils::formatting;

pub use error::{AnalyzerError, Result};
