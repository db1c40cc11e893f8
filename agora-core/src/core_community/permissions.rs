//! View/post authorization and token-permission indexing

use super::access;
use super::errors::{CommunityError, CommunityResult};
use super::types::{
    AccessLevel, ChannelRole, CommunityId, Description, MemberKey, TokenPermission, TokenPermissionType,
};
use std::collections::HashMap;

/// Kind of message an actor wants to post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    ChatMessage,
    EmojiReaction,
}

/// Token permissions grouped by the full chat id they reference.
///
/// Built once per description version and rebuilt whenever the token
/// permission list changes.
#[derive(Debug, Clone, Default)]
pub struct TokenPermissionIndex {
    by_chat: HashMap<String, Vec<TokenPermission>>,
}

impl TokenPermissionIndex {
    pub fn build(permissions: &[TokenPermission]) -> Self {
        let mut by_chat: HashMap<String, Vec<TokenPermission>> = HashMap::new();
        for permission in permissions {
            for chat_id in &permission.chat_ids {
                by_chat
                    .entry(chat_id.clone())
                    .or_default()
                    .push(permission.clone());
            }
        }
        TokenPermissionIndex { by_chat }
    }

    /// Permissions referencing `chat_id`, in insertion order
    pub fn for_chat(&self, chat_id: &str) -> &[TokenPermission] {
        self.by_chat.get(chat_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_type(&self, chat_id: &str, permission_type: TokenPermissionType) -> Vec<TokenPermission> {
        self.for_chat(chat_id)
            .iter()
            .filter(|p| p.permission_type == permission_type)
            .cloned()
            .collect()
    }

    /// Whether the chat is token-gated.
    ///
    /// A chat is gated when a channel-scoped permission references it, unless a
    /// view permission with no criteria leaves it open to every reader.
    pub fn is_encrypted(&self, chat_id: &str) -> bool {
        let permissions = self.for_chat(chat_id);

        let gated = permissions
            .iter()
            .any(|p| p.permission_type.is_channel_scoped());

        let read_open = permissions.iter().any(|p| {
            p.permission_type == TokenPermissionType::CanViewChannel && p.token_criteria.is_empty()
        });

        gated && !read_open
    }

    pub fn is_empty(&self) -> bool {
        self.by_chat.is_empty()
    }
}

/// Whether `actor` may read `chat_id`. Unknown chats are never viewable.
pub fn can_view(
    description: &Description,
    community_id: &CommunityId,
    actor: &MemberKey,
    chat_id: &str,
) -> bool {
    let Some(chat) = description.chats.get(chat_id) else {
        return false;
    };

    if *actor == community_id.owner_key() {
        return true;
    }

    let member = description.members.get(actor);
    if access::is_admin(member) {
        return true;
    }

    if member.is_none() {
        return false;
    }

    chat.access() == AccessLevel::AutoAccept || chat.is_member(actor)
}

/// Whether `actor` may post a message of `kind` in `chat_id`
pub fn can_post(
    description: &Description,
    community_id: &CommunityId,
    control_node: Option<&MemberKey>,
    actor: &MemberKey,
    chat_id: &str,
    kind: MessageKind,
) -> CommunityResult<bool> {
    let chat = description
        .chats
        .get(chat_id)
        .ok_or_else(|| CommunityError::ChatNotFound(chat_id.to_string()))?;

    if *actor == community_id.owner_key() || control_node == Some(actor) {
        return Ok(true);
    }

    let member = description.members.get(actor);
    if access::is_owner(member) {
        return Ok(true);
    }

    if member.is_none() {
        return Ok(false);
    }

    let Some(chat_member) = chat.members.get(actor) else {
        return Ok(false);
    };

    let allowed = match (chat_member.channel_role, kind) {
        (ChannelRole::Viewer, MessageKind::ChatMessage) => false,
        (ChannelRole::Viewer, MessageKind::EmojiReaction) => chat.viewers_can_post_reactions,
        (ChannelRole::Inherit | ChannelRole::Poster, _) => true,
    };

    Ok(allowed)
}
