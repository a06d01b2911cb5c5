//! In-memory clipboard history.

mod dedup;
mod store;

pub use dedup::SeenSet;
pub use store::HistoryStore;
