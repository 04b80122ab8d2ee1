//! Per-character, per-debate memory: structured working memory updated every
//! turn, episodic compression of older turns, and context assembly for the
//! next model call.

pub mod context;
pub mod episodic;
pub mod working;

pub use context::{AssembledContext, ContextAssembler};
pub use episodic::{compress, should_compress};
pub use working::{MemoryUpdate, WorkingMemory, update_working_memory};
