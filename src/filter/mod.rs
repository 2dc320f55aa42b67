pub mod criteria;

pub use criteria::{FilterCriteria, apply_all, distinct_protocols};
