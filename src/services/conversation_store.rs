use std::collections::HashMap;

use super::reconciler::{self, Merged};
use super::titles::TitleOverrideStore;
use crate::error::SyncError;
use crate::models::{CanonicalId, Conversation, ConversationId, ConversationSummary, DraftToken};

/// Outcome of `ConversationStore::promote_draft`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    Promoted,
    /// The draft was promoted before; nothing changed.
    AlreadyPromoted(CanonicalId),
}

/// Canonical in-memory conversation list and the active selection.
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
    promotions: HashMap<DraftToken, CanonicalId>,
    titles: TitleOverrideStore,
}

impl ConversationStore {
    pub fn new(titles: TitleOverrideStore) -> Self {
        Self {
            conversations: Vec::new(),
            active: None,
            promotions: HashMap::new(),
            titles,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    /// Map a draft that has already been promoted to its canonical identity.
    pub fn resolve(&self, id: &ConversationId) -> ConversationId {
        match id {
            ConversationId::Draft(token) => match self.promotions.get(token) {
                Some(canonical) => ConversationId::Canonical(canonical.clone()),
                None => id.clone(),
            },
            ConversationId::Canonical(_) => id.clone(),
        }
    }

    /// Publish a server list: decorate, then reconcile against local state.
    pub fn apply_refresh(&mut self, server: Vec<ConversationSummary>) {
        let server = self
            .titles
            .decorate(server.into_iter().map(Conversation::from).collect());

        let Merged {
            conversations,
            active,
        } = reconciler::merge(server, &self.conversations, self.active.as_ref());

        tracing::debug!(
            "Conversation list refreshed: {} entries, active {:?}",
            conversations.len(),
            active.as_ref().map(ToString::to_string)
        );
        self.conversations = conversations;
        self.active = active;
    }

    /// Start a new local conversation at the head and select it. A previous
    /// draft that was never sent from is dropped so only one draft exists.
    pub fn create_draft(&mut self) -> ConversationId {
        self.conversations.retain(|c| !c.id.is_draft());

        let id = ConversationId::new_draft();
        self.conversations.insert(0, Conversation::draft(id.clone()));
        self.active = Some(id.clone());

        tracing::debug!("Created draft conversation {}", id);
        id
    }

    /// Replace a draft with its canonical counterpart. Runs once per draft.
    pub fn promote_draft(&mut self, token: DraftToken, canonical: ConversationSummary) -> Promotion {
        if let Some(existing) = self.promotions.get(&token) {
            return Promotion::AlreadyPromoted(existing.clone());
        }
        self.promotions.insert(token, canonical.id.clone());

        let draft_id = ConversationId::Draft(token);
        let canonical_id = ConversationId::Canonical(canonical.id.clone());

        if let Err(e) = self.titles.copy(&draft_id, &canonical_id) {
            tracing::warn!("Failed to carry title override to {}: {}", canonical_id, e);
        }

        let draft_pos = self.conversations.iter().position(|c| c.id == draft_id);
        let already_listed = self.conversations.iter().any(|c| c.id == canonical_id);
        let mut decorated = self.titles.decorate(vec![Conversation::from(canonical)]);

        match (draft_pos, already_listed) {
            (Some(pos), false) => self.conversations[pos] = decorated.remove(0),
            (Some(pos), true) => {
                self.conversations.remove(pos);
            }
            (None, false) => self.conversations.insert(0, decorated.remove(0)),
            (None, true) => {}
        }

        // A refresh may have listed the canonical entry with its server title.
        if already_listed {
            let current = std::mem::take(&mut self.conversations);
            self.conversations = self.titles.decorate(current);
        }

        if self.active.as_ref() == Some(&draft_id) {
            self.active = Some(canonical_id.clone());
        }

        tracing::debug!("Promoted {} to {}", draft_id, canonical_id);
        Promotion::Promoted
    }

    /// Drop a draft that was never promoted.
    pub fn discard_draft(&mut self, token: DraftToken) {
        if self.promotions.contains_key(&token) {
            return;
        }
        let draft_id = ConversationId::Draft(token);
        self.conversations.retain(|c| c.id != draft_id);
        if self.active.as_ref() == Some(&draft_id) {
            self.active = None;
        }
    }

    /// Insert a conversation the server created on request, and select it.
    pub fn insert_canonical(&mut self, conversation: Conversation) {
        let id = conversation.id.clone();
        self.conversations.retain(|c| c.id != id);
        let mut decorated = self.titles.decorate(vec![conversation]);
        self.conversations.insert(0, decorated.remove(0));
        self.active = Some(id);
    }

    pub fn rename(&mut self, id: &ConversationId, title: &str) -> Result<(), SyncError> {
        let id = self.resolve(id);
        self.titles.set(&id, title)?;

        let current = std::mem::take(&mut self.conversations);
        self.conversations = self.titles.decorate(current);
        Ok(())
    }

    /// Selection change only. Ids not in the list are refused.
    pub fn set_active(&mut self, id: &ConversationId) -> bool {
        let id = self.resolve(id);
        if self.get(&id).is_none() {
            tracing::warn!("Ignoring selection of unknown conversation {}", id);
            return false;
        }
        self.active = Some(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::Database;
    use crate::transport::fake::summary;

    fn store() -> ConversationStore {
        let db = Database::new_in_memory().unwrap();
        ConversationStore::new(TitleOverrideStore::open(Box::new(db)))
    }

    fn canonical(id: &str) -> ConversationSummary {
        summary(id, Some("Server title"))
    }

    fn token(id: &ConversationId) -> DraftToken {
        match id {
            ConversationId::Draft(token) => *token,
            ConversationId::Canonical(_) => panic!("expected a draft"),
        }
    }

    #[test]
    fn test_refresh_applies_overrides() {
        let mut store = store();
        store.apply_refresh(vec![summary("x", Some("Untitled"))]);
        let x = ConversationId::canonical("x");

        store.rename(&x, "Roadmap").unwrap();
        assert_eq!(store.get(&x).unwrap().title, "Roadmap");

        store.apply_refresh(vec![summary("x", Some("Untitled"))]);
        assert_eq!(store.get(&x).unwrap().title, "Roadmap");
    }

    #[test]
    fn test_missing_server_title_uses_default() {
        let mut store = store();
        store.apply_refresh(vec![summary("x", None)]);
        assert_eq!(store.conversations()[0].title, "New Conversation");
        assert_eq!(store.active(), Some(&ConversationId::canonical("x")));
    }

    #[test]
    fn test_create_draft_selects_it() {
        let mut store = store();
        store.apply_refresh(vec![summary("a", None)]);

        let draft = store.create_draft();
        assert_eq!(store.conversations()[0].id, draft);
        assert_eq!(store.active(), Some(&draft));

        let second = store.create_draft();
        assert_eq!(
            store.conversations().iter().filter(|c| c.id.is_draft()).count(),
            1
        );
        assert_eq!(store.active(), Some(&second));
    }

    #[test]
    fn test_promote_draft_in_place_once() {
        let mut store = store();
        store.apply_refresh(vec![summary("a", None)]);
        let draft = store.create_draft();
        store.rename(&draft, "Early name").unwrap();

        let result = store.promote_draft(token(&draft), canonical("c1"));
        assert_eq!(result, Promotion::Promoted);

        let c1 = ConversationId::canonical("c1");
        assert_eq!(store.conversations()[0].id, c1);
        assert_eq!(store.conversations()[0].title, "Early name");
        assert_eq!(store.active(), Some(&c1));
        assert_eq!(store.resolve(&draft), c1);

        let again = store.promote_draft(token(&draft), canonical("c2"));
        assert_eq!(again, Promotion::AlreadyPromoted(CanonicalId::new("c1")));
        assert!(store.get(&ConversationId::canonical("c2")).is_none());
        assert_eq!(store.conversations().len(), 2);
    }

    #[test]
    fn test_promote_when_server_already_lists_it() {
        let mut store = store();
        let draft = store.create_draft();
        store.apply_refresh(vec![summary("c1", Some("From server"))]);

        store.promote_draft(token(&draft), canonical("c1"));
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.conversations()[0].title, "From server");
        assert_eq!(store.active(), Some(&ConversationId::canonical("c1")));
    }

    #[test]
    fn test_promote_keeps_draft_title_over_listed_server_title() {
        let mut store = store();
        let draft = store.create_draft();
        store.rename(&draft, "Planning").unwrap();
        store.apply_refresh(vec![summary("c1", Some("Server title"))]);

        store.promote_draft(token(&draft), canonical("c1"));

        let c1 = ConversationId::canonical("c1");
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.get(&c1).unwrap().title, "Planning");
        assert_eq!(store.active(), Some(&c1));

        store.apply_refresh(vec![summary("c1", Some("Server title"))]);
        assert_eq!(store.get(&c1).unwrap().title, "Planning");
    }

    #[test]
    fn test_promote_removed_draft_keeps_title_when_listed() {
        let mut store = store();
        let draft = store.create_draft();
        store.rename(&draft, "Planning").unwrap();
        store.create_draft();
        store.apply_refresh(vec![summary("c1", Some("Server title"))]);

        store.promote_draft(token(&draft), canonical("c1"));
        assert_eq!(
            store.get(&ConversationId::canonical("c1")).unwrap().title,
            "Planning"
        );
    }

    #[test]
    fn test_promote_removed_draft_goes_to_head() {
        let mut store = store();
        store.apply_refresh(vec![summary("a", None)]);
        let draft = store.create_draft();
        store.create_draft();

        store.promote_draft(token(&draft), canonical("c1"));
        assert_eq!(store.conversations()[0].id, ConversationId::canonical("c1"));
        assert!(store.active().unwrap().is_draft());
    }

    #[test]
    fn test_discard_draft() {
        let mut store = store();
        let draft = store.create_draft();
        store.discard_draft(token(&draft));
        assert!(store.conversations().is_empty());
        assert!(store.active().is_none());
    }

    #[test]
    fn test_set_active_refuses_unknown() {
        let mut store = store();
        store.apply_refresh(vec![summary("a", None), summary("b", None)]);
        assert!(store.set_active(&ConversationId::canonical("b")));
        assert!(!store.set_active(&ConversationId::canonical("zzz")));
        assert_eq!(store.active(), Some(&ConversationId::canonical("b")));
    }

    #[test]
    fn test_missing_active_survives_refresh() {
        let mut store = store();
        store.apply_refresh(vec![summary("a", None), summary("b", None)]);
        let b = ConversationId::canonical("b");
        store.set_active(&b);

        store.apply_refresh(vec![summary("a", None)]);
        assert_eq!(store.active(), Some(&b));
        assert!(store.get(&b).is_some());
    }

    #[test]
    fn test_rename_validation() {
        let mut store = store();
        store.apply_refresh(vec![summary("a", Some("A"))]);
        let err = store.rename(&ConversationId::canonical("a"), " ").unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert_eq!(store.conversations()[0].title, "A");
    }
}
