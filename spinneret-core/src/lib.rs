pub mod data;
pub mod report;
pub mod store;

pub use data::{Database, SiteSummary};
pub use store::SqliteStore;
