//! Type definitions for community descriptions

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Chat identifier, unique within a community
pub type ChatId = String;

/// Category identifier, unique within a community
pub type CategoryId = String;

/// Identifier of a community, derived from the public key that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommunityId(pub [u8; 32]);

impl CommunityId {
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        CommunityId(key.to_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        CommunityId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Member key of the identity that owns this community
    pub fn owner_key(&self) -> MemberKey {
        MemberKey(hex::encode(self.0))
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<&VerifyingKey> for CommunityId {
    fn from(key: &VerifyingKey) -> Self {
        CommunityId::from_public_key(key)
    }
}

/// Hex-encoded public key of a member; the key of every member map.
/// Always lower case, including when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct MemberKey(String);

impl MemberKey {
    pub fn new(hex_key: impl Into<String>) -> Self {
        MemberKey(hex_key.into().to_lowercase())
    }

    pub fn from_public_key(key: &VerifyingKey) -> Self {
        MemberKey(hex::encode(key.to_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MemberKey {
    fn from(hex_key: String) -> Self {
        MemberKey::new(hex_key)
    }
}

impl From<&VerifyingKey> for MemberKey {
    fn from(key: &VerifyingKey) -> Self {
        MemberKey::from_public_key(key)
    }
}

impl From<CommunityId> for MemberKey {
    fn from(id: CommunityId) -> Self {
        id.owner_key()
    }
}

/// Community-level roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Admin,
    Member,
}

/// How a community or chat admits new members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    /// Sentinel for an unset or unrecognised value; never valid in a description
    #[default]
    Unknown,
    /// No membership required: anyone may join and post
    AutoAccept,
    /// Joining requires a request approved by the control node
    ManualAccept,
    /// Only invited identities may join
    InvitationOnly,
}

impl AccessLevel {
    pub fn is_known(&self) -> bool {
        !matches!(self, AccessLevel::Unknown)
    }

    /// Whether joining goes through a request-and-approval workflow
    pub fn requires_approval(&self) -> bool {
        matches!(self, AccessLevel::ManualAccept)
    }
}

/// Per-channel override of what a chat member may do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelRole {
    /// No override; the member's community role decides
    #[default]
    Inherit,
    /// May read but not post
    Viewer,
    /// May read and post
    Poster,
}

/// A member entry, in the community member map or in a chat member map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Community roles; owner privilege subsumes admin at check time
    pub roles: BTreeSet<Role>,

    /// Only meaningful inside a chat member map
    pub channel_role: ChannelRole,
}

impl Member {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Member {
            roles: roles.into_iter().collect(),
            channel_role: ChannelRole::Inherit,
        }
    }

    pub fn with_channel_role(mut self, channel_role: ChannelRole) -> Self {
        self.channel_role = channel_role;
        self
    }
}

/// Display metadata of a chat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatIdentity {
    pub display_name: String,
    pub description: String,
    pub emoji: String,
    pub color: String,
}

impl ChatIdentity {
    pub fn named(display_name: impl Into<String>) -> Self {
        ChatIdentity {
            display_name: display_name.into(),
            ..Default::default()
        }
    }
}

/// Access rules of the community or of one chat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPermissions {
    pub access: AccessLevel,

    /// Requests must carry an ENS name
    pub ens_only: bool,

    pub private: bool,
}

impl CommunityPermissions {
    pub fn with_access(access: AccessLevel) -> Self {
        CommunityPermissions {
            access,
            ..Default::default()
        }
    }
}

/// A chat (channel) inside a community
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub identity: ChatIdentity,

    /// `None` makes the enclosing description invalid
    pub permissions: Option<CommunityPermissions>,

    /// Subset of the community members
    pub members: BTreeMap<MemberKey, Member>,

    /// Ordinal within the chat's category
    pub position: u32,

    pub category_id: Option<CategoryId>,

    pub hide_if_permissions_not_met: bool,

    pub viewers_can_post_reactions: bool,
}

impl Chat {
    pub fn new(identity: ChatIdentity, permissions: CommunityPermissions) -> Self {
        Chat {
            identity,
            permissions: Some(permissions),
            ..Default::default()
        }
    }

    pub fn is_member(&self, key: &MemberKey) -> bool {
        self.members.contains_key(key)
    }

    pub fn access(&self) -> AccessLevel {
        self.permissions.map(|p| p.access).unwrap_or_default()
    }

    /// True if any field other than the member map differs
    pub(crate) fn settings_differ(&self, other: &Chat) -> bool {
        self.identity != other.identity
            || self.permissions != other.permissions
            || self.position != other.position
            || self.category_id != other.category_id
            || self.hide_if_permissions_not_met != other.hide_if_permissions_not_met
            || self.viewers_can_post_reactions != other.viewers_can_post_reactions
    }
}

/// Ordering group for chats; not hierarchical
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub position: u32,
}

/// What holding a token permission's criteria grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenPermissionType {
    BecomeAdmin,
    BecomeMember,
    CanViewChannel,
    CanViewAndPostChannel,
    BecomeTokenMaster,
    BecomeTokenOwner,
}

impl TokenPermissionType {
    /// Permission types that gate individual chats rather than the community
    pub fn is_channel_scoped(&self) -> bool {
        matches!(
            self,
            TokenPermissionType::CanViewChannel | TokenPermissionType::CanViewAndPostChannel
        )
    }
}

/// Asset standard a criterion refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    #[default]
    Erc20,
    Erc721,
    Ens,
}

/// One holding requirement. Carried as data only; never evaluated here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCriteria {
    pub kind: TokenKind,

    /// Chain id to contract address
    pub contract_addresses: BTreeMap<u64, String>,

    pub symbol: String,
    pub name: String,

    /// Decimal string; amounts exceed u64 for 18-decimal tokens
    pub amount: String,

    pub token_ids: Vec<u64>,
    pub ens_pattern: String,
    pub decimals: u64,
}

/// A token-gating rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPermission {
    pub id: String,
    pub permission_type: TokenPermissionType,
    pub token_criteria: Vec<TokenCriteria>,

    /// Full chat ids (see [`crate::core_community::Community::chat_id`])
    pub chat_ids: Vec<String>,

    pub is_private: bool,
}

impl TokenPermission {
    pub fn new(id: impl Into<String>, permission_type: TokenPermissionType) -> Self {
        TokenPermission {
            id: id.into(),
            permission_type,
            token_criteria: Vec::new(),
            chat_ids: Vec::new(),
            is_private: false,
        }
    }

    pub fn for_chats<I, S>(mut self, chat_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chat_ids = chat_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_criteria(mut self, criteria: Vec<TokenCriteria>) -> Self {
        self.token_criteria = criteria;
        self
    }

    pub fn applies_to(&self, chat_id: &str) -> bool {
        self.chat_ids.iter().any(|id| id == chat_id)
    }
}

/// Display metadata of the community itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityIdentity {
    pub display_name: String,
    pub description: String,
    pub color: String,
}

/// The authoritative, replicated state of a community
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// Lamport clock; every accepted change strictly increases it
    pub clock: u64,

    pub identity: CommunityIdentity,

    pub members: BTreeMap<MemberKey, Member>,
    pub chats: BTreeMap<ChatId, Chat>,
    pub categories: BTreeMap<CategoryId, Category>,

    /// Org-level access; `None` makes the description invalid
    pub permissions: Option<CommunityPermissions>,

    /// Insertion ordered
    pub token_permissions: Vec<TokenPermission>,
}

impl Description {
    pub fn new(permissions: CommunityPermissions) -> Self {
        Description {
            permissions: Some(permissions),
            ..Default::default()
        }
    }

    pub fn has_member(&self, key: &MemberKey) -> bool {
        self.members.contains_key(key)
    }

    pub fn access(&self) -> AccessLevel {
        self.permissions.map(|p| p.access).unwrap_or_default()
    }

    pub fn token_permission(&self, id: &str) -> Option<&TokenPermission> {
        self.token_permissions.iter().find(|p| p.id == id)
    }
}
