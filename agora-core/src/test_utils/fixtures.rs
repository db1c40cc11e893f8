//! Test fixtures for creating common test objects
//!
//! Identities are derived from fixed seeds so member keys are stable across
//! runs: `signing_key(1)` is always the community owner.

use crate::core_community::{
    AccessLevel, Chat, ChatIdentity, ChannelRole, CommunityConfig, CommunityId,
    CommunityPermissions, Description, Member, MemberKey, Role, TimeSource, TokenPermission,
};
use ed25519_dalek::SigningKey;
use std::sync::atomic::{AtomicU64, Ordering};

/// Seed of the community owner identity
pub const OWNER_SEED: u8 = 1;

/// Deterministic signing key for test identity `seed`
pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn owner_signing_key() -> SigningKey {
    signing_key(OWNER_SEED)
}

/// Member key of test identity `seed`
pub fn member_key(seed: u8) -> MemberKey {
    MemberKey::from_public_key(&signing_key(seed).verifying_key())
}

/// Id of the test community owned by `signing_key(OWNER_SEED)`
pub fn community_id() -> CommunityId {
    CommunityId::from_public_key(&owner_signing_key().verifying_key())
}

/// Valid description at clock 1 with the owner as only member
pub fn base_description() -> Description {
    DescriptionBuilder::new(AccessLevel::ManualAccept)
        .clock(1)
        .member(member_key(OWNER_SEED), [Role::Owner])
        .build()
}

/// Config of the owning device
pub fn owner_config() -> CommunityConfig {
    CommunityConfig::for_owner(owner_signing_key(), base_description())
}

/// Config of a replica whose local identity is `signing_key(seed)`
pub fn replica_config(seed: u8) -> CommunityConfig {
    CommunityConfig::new(community_id(), base_description())
        .with_member_identity(signing_key(seed))
        .with_control_node(member_key(OWNER_SEED))
}

/// Builder for test descriptions
pub struct DescriptionBuilder {
    description: Description,
}

impl DescriptionBuilder {
    pub fn new(access: AccessLevel) -> Self {
        Self {
            description: Description::new(CommunityPermissions::with_access(access)),
        }
    }

    pub fn clock(mut self, clock: u64) -> Self {
        self.description.clock = clock;
        self
    }

    pub fn ens_only(mut self) -> Self {
        if let Some(permissions) = self.description.permissions.as_mut() {
            permissions.ens_only = true;
        }
        self
    }

    pub fn member(mut self, key: MemberKey, roles: impl IntoIterator<Item = Role>) -> Self {
        self.description.members.insert(key, Member::with_roles(roles));
        self
    }

    /// Add a chat whose members are taken from the community member map
    pub fn chat(mut self, id: &str, access: AccessLevel, members: &[MemberKey]) -> Self {
        let mut chat = Chat::new(
            ChatIdentity::named(id),
            CommunityPermissions::with_access(access),
        );
        chat.position = self.description.chats.len() as u32;
        for key in members {
            chat.members.insert(key.clone(), Member::new());
        }
        self.description.chats.insert(id.to_string(), chat);
        self
    }

    /// Set the channel role of an existing chat member
    pub fn channel_role(mut self, chat_id: &str, key: &MemberKey, role: ChannelRole) -> Self {
        if let Some(member) = self
            .description
            .chats
            .get_mut(chat_id)
            .and_then(|chat| chat.members.get_mut(key))
        {
            member.channel_role = role;
        }
        self
    }

    pub fn ens_only_chat(mut self, chat_id: &str) -> Self {
        if let Some(permissions) = self
            .description
            .chats
            .get_mut(chat_id)
            .and_then(|chat| chat.permissions.as_mut())
        {
            permissions.ens_only = true;
        }
        self
    }

    pub fn token_permission(mut self, permission: TokenPermission) -> Self {
        self.description.token_permissions.push(permission);
        self
    }

    pub fn build(self) -> Description {
        self.description
    }
}

/// Time source returning a settable instant
#[derive(Debug, Default)]
pub struct FixedTimeSource {
    now: AtomicU64,
}

impl FixedTimeSource {
    pub fn new(now_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: u64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
