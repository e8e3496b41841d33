pub mod conversation;
pub mod identity;
pub mod message;

pub use conversation::{Conversation, ConversationSummary};
pub use identity::{CanonicalId, ConversationId, DraftToken, MessageId};
pub use message::{Message, Role, ServerMessage};
