//! Merge of a freshly fetched server list with local, partly unacknowledged
//! conversation state.

use std::collections::HashSet;

use crate::models::{Conversation, ConversationId};

#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub conversations: Vec<Conversation>,
    pub active: Option<ConversationId>,
}

/// Result order is `[active kept locally?] + drafts + server`.
///
/// A canonical active conversation the server does not report yet (stale
/// read racing a promotion) keeps its local copy at the front. Drafts the
/// server already lists are superseded by the server copy. Identities are
/// unique in the result even if the server list repeats one.
pub fn merge(
    server: Vec<Conversation>,
    local: &[Conversation],
    active: Option<&ConversationId>,
) -> Merged {
    let mut server_ids = HashSet::with_capacity(server.len());
    let server: Vec<Conversation> = server
        .into_iter()
        .filter(|c| server_ids.insert(c.id.clone()))
        .collect();

    let drafts = local
        .iter()
        .filter(|c| c.id.is_draft() && !server_ids.contains(&c.id));

    let missing_active = match active {
        Some(id @ ConversationId::Canonical(_)) if !server_ids.contains(id) => {
            local.iter().find(|c| &c.id == id)
        }
        _ => None,
    };

    let mut conversations = Vec::with_capacity(server.len() + 2);
    conversations.extend(missing_active.cloned());
    conversations.extend(drafts.cloned());

    let next_active = match active {
        Some(id) => Some(id.clone()),
        None => server.first().map(|c| c.id.clone()),
    };

    conversations.extend(server);

    Merged {
        conversations,
        active: next_active,
    }
}
