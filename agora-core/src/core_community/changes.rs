//! Structured difference between two description versions

use super::types::{Category, CategoryId, Chat, ChatId, Description, Member, MemberKey, TokenPermission};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Changes to a chat present in both versions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChanges {
    /// The new chat, when any field besides its member map changed
    pub chat_modified: Option<Chat>,

    pub identity_changed: bool,
    pub permissions_changed: bool,

    pub members_added: BTreeMap<MemberKey, Member>,
    pub members_removed: BTreeMap<MemberKey, Member>,
}

impl ChatChanges {
    pub fn is_empty(&self) -> bool {
        self.chat_modified.is_none()
            && self.members_added.is_empty()
            && self.members_removed.is_empty()
    }
}

/// Everything that differs between two description versions.
///
/// Computed for downstream propagation and rendering; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityChanges {
    pub members_added: BTreeMap<MemberKey, Member>,
    pub members_removed: BTreeMap<MemberKey, Member>,

    pub chats_added: BTreeMap<ChatId, Chat>,
    pub chats_removed: BTreeMap<ChatId, Chat>,
    pub chats_modified: BTreeMap<ChatId, ChatChanges>,

    pub categories_added: BTreeMap<CategoryId, Category>,
    pub categories_removed: BTreeMap<CategoryId, Category>,
    pub categories_modified: BTreeMap<CategoryId, Category>,

    pub token_permissions_added: BTreeMap<String, TokenPermission>,
    pub token_permissions_modified: BTreeMap<String, TokenPermission>,
    pub token_permissions_removed: BTreeMap<String, TokenPermission>,
}

impl CommunityChanges {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.members_added.is_empty()
            && self.members_removed.is_empty()
            && self.chats_added.is_empty()
            && self.chats_removed.is_empty()
            && self.chats_modified.is_empty()
            && self.categories_added.is_empty()
            && self.categories_removed.is_empty()
            && self.categories_modified.is_empty()
            && self.token_permissions_added.is_empty()
            && self.token_permissions_modified.is_empty()
            && self.token_permissions_removed.is_empty()
    }

    /// Fold a later change set into this one. Entries of `other` win.
    pub fn merge(&mut self, other: CommunityChanges) {
        self.members_added.extend(other.members_added);
        self.members_removed.extend(other.members_removed);
        self.chats_added.extend(other.chats_added);
        self.chats_removed.extend(other.chats_removed);

        for (id, changes) in other.chats_modified {
            let entry = self.chats_modified.entry(id).or_default();
            if changes.chat_modified.is_some() {
                entry.chat_modified = changes.chat_modified;
            }
            entry.identity_changed |= changes.identity_changed;
            entry.permissions_changed |= changes.permissions_changed;
            entry.members_added.extend(changes.members_added);
            entry.members_removed.extend(changes.members_removed);
        }

        self.categories_added.extend(other.categories_added);
        self.categories_removed.extend(other.categories_removed);
        self.categories_modified.extend(other.categories_modified);
        self.token_permissions_added.extend(other.token_permissions_added);
        self.token_permissions_modified.extend(other.token_permissions_modified);
        self.token_permissions_removed.extend(other.token_permissions_removed);
    }
}

fn key_difference<K, V>(left: &BTreeMap<K, V>, right: &BTreeMap<K, V>) -> BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    left.iter()
        .filter(|(key, _)| !right.contains_key(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn diff_chat(old: &Chat, new: &Chat) -> ChatChanges {
    let mut changes = ChatChanges {
        members_added: key_difference(&new.members, &old.members),
        members_removed: key_difference(&old.members, &new.members),
        ..Default::default()
    };

    if old.settings_differ(new) {
        changes.identity_changed = old.identity != new.identity;
        changes.permissions_changed = old.permissions != new.permissions;
        changes.chat_modified = Some(new.clone());
    }

    changes
}

fn token_permissions_by_id(permissions: &[TokenPermission]) -> BTreeMap<String, TokenPermission> {
    permissions
        .iter()
        .map(|p| (p.id.clone(), p.clone()))
        .collect()
}

/// Compute what changed going from `old` to `new`.
///
/// Role changes of members present in both versions are not reported.
pub fn diff(old: &Description, new: &Description) -> CommunityChanges {
    let mut changes = CommunityChanges {
        members_added: key_difference(&new.members, &old.members),
        members_removed: key_difference(&old.members, &new.members),
        chats_added: key_difference(&new.chats, &old.chats),
        chats_removed: key_difference(&old.chats, &new.chats),
        categories_added: key_difference(&new.categories, &old.categories),
        categories_removed: key_difference(&old.categories, &new.categories),
        ..Default::default()
    };

    for (id, new_chat) in &new.chats {
        let Some(old_chat) = old.chats.get(id) else {
            continue;
        };
        let chat_changes = diff_chat(old_chat, new_chat);
        if !chat_changes.is_empty() {
            changes.chats_modified.insert(id.clone(), chat_changes);
        }
    }

    for (id, new_category) in &new.categories {
        if let Some(old_category) = old.categories.get(id) {
            if old_category != new_category {
                changes.categories_modified.insert(id.clone(), new_category.clone());
            }
        }
    }

    let old_permissions = token_permissions_by_id(&old.token_permissions);
    let new_permissions = token_permissions_by_id(&new.token_permissions);
    changes.token_permissions_added = key_difference(&new_permissions, &old_permissions);
    changes.token_permissions_removed = key_difference(&old_permissions, &new_permissions);
    for (id, permission) in &new_permissions {
        if let Some(old_permission) = old_permissions.get(id) {
            if old_permission != permission {
                changes.token_permissions_modified.insert(id.clone(), permission.clone());
            }
        }
    }

    changes
}
