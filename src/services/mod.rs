pub mod ai_service; // Vision model trait + image input
pub mod database;
pub mod history;
pub mod openrouter; // OpenRouter AI service
pub mod prompt;
pub mod recipe_parser;

pub use ai_service::{ImageInput, VisionService};
pub use database::Database;
pub use history::{HistoryStore, MemoryStorage, SnapshotStorage};
pub use openrouter::OpenRouterService;
pub use prompt::dietary_hint;
pub use recipe_parser::{inspect_response, parse_response};
