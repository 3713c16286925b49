pub mod patch;
pub mod store;
pub mod types;

pub use patch::PatchOperation;
pub use store::{KnowledgeStore, StoreStats};
pub use types::{KnowledgeDocument, ScoredDocument};
