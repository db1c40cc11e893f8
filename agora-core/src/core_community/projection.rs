//! Presentation view of a community, evaluated for the local member

use super::access;
use super::community_config::CommunityConfig;
use super::permissions::{self, MessageKind, TokenPermissionIndex};
use super::types::{
    Category, CategoryId, ChatId, CommunityPermissions, Member, MemberKey, TokenPermission,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A chat as shown to the local member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    pub id: ChatId,
    pub name: String,
    pub description: String,
    pub emoji: String,
    pub color: String,
    #[serde(rename = "categoryID")]
    pub category_id: Option<CategoryId>,
    pub position: u32,
    pub permissions: Option<CommunityPermissions>,
    pub members: BTreeMap<MemberKey, Member>,
    pub can_post: bool,
    pub can_post_reactions: bool,
    pub can_view: bool,
    pub token_gated: bool,
    pub hide_if_permissions_not_met: bool,
    pub viewers_can_post_reactions: bool,
}

/// A community as shown to the local member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub clock: u64,
    pub admin: bool,
    pub joined: bool,
    pub is_control_node: bool,
    pub permissions: Option<CommunityPermissions>,
    pub members: BTreeMap<MemberKey, Member>,
    pub chats: BTreeMap<ChatId, ChatView>,
    pub categories: BTreeMap<CategoryId, Category>,
    pub token_permissions: Vec<TokenPermission>,
}

pub(crate) fn project(config: &CommunityConfig, index: &TokenPermissionIndex) -> CommunityView {
    let description = &config.description;
    let actor = config.member_key();
    let control_node = config.control_node.as_ref();
    let community_prefix = config.id.to_string();

    let post = |chat_id: &str, kind: MessageKind| {
        actor
            .as_ref()
            .map(|actor| {
                permissions::can_post(description, &config.id, control_node, actor, chat_id, kind)
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    };

    let chats = description
        .chats
        .iter()
        .map(|(id, chat)| {
            let view = ChatView {
                id: id.clone(),
                name: chat.identity.display_name.clone(),
                description: chat.identity.description.clone(),
                emoji: chat.identity.emoji.clone(),
                color: chat.identity.color.clone(),
                category_id: chat.category_id.clone(),
                position: chat.position,
                permissions: chat.permissions,
                members: chat.members.clone(),
                can_post: post(id, MessageKind::ChatMessage),
                can_post_reactions: post(id, MessageKind::EmojiReaction),
                can_view: actor
                    .as_ref()
                    .map(|actor| permissions::can_view(description, &config.id, actor, id))
                    .unwrap_or(false),
                token_gated: index.is_encrypted(&format!("{}{}", community_prefix, id)),
                hide_if_permissions_not_met: chat.hide_if_permissions_not_met,
                viewers_can_post_reactions: chat.viewers_can_post_reactions,
            };
            (id.clone(), view)
        })
        .collect();

    let admin = access::has_write_authority(Some(config))
        || actor
            .as_ref()
            .map(|actor| access::is_admin(description.members.get(actor)))
            .unwrap_or(false);

    CommunityView {
        id: community_prefix,
        name: description.identity.display_name.clone(),
        description: description.identity.description.clone(),
        color: description.identity.color.clone(),
        clock: description.clock,
        admin,
        joined: config.joined,
        is_control_node: access::is_control_node(Some(config)),
        permissions: description.permissions,
        members: description.members.clone(),
        chats,
        categories: description.categories.clone(),
        token_permissions: description.token_permissions.clone(),
    }
}
