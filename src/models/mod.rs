pub mod chunk;
pub mod conversation;
pub mod exercise;
pub mod page;
pub mod progress;

pub use chunk::{Chunk, ChunkPlan};
pub use conversation::{ConversationTurn, GenerationRequest, Role};
pub use exercise::ExerciseRecord;
pub use page::PageMap;
pub use progress::ProgressState;
