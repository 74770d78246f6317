//! The built-in static-crawl plugins. Listed in their conventional pipeline
//! order; any subset in any order is a legal pipeline.

pub mod extract;
pub mod fetch;
pub mod insert;
pub mod select;
pub mod upsert;

pub use extract::ExtractPlugin;
pub use fetch::FetchPlugin;
pub use insert::InsertPlugin;
pub use select::SelectPlugin;
pub use upsert::UpsertPlugin;
