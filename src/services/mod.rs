pub mod conversation_store;
pub mod database;
pub mod message_cache;
pub mod reconciler;
pub mod send_pipeline;
pub mod state;
pub mod sync;
pub mod titles;

pub use conversation_store::ConversationStore;
pub use database::Database;
pub use message_cache::MessageCache;
pub use send_pipeline::{SendOutcome, SendPipeline};
pub use state::{SyncEvent, SyncView};
pub use sync::SyncController;
pub use titles::{OverrideStorage, TitleOverrideStore};
