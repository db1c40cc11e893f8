//! Requests to join a community or one of its chats

use super::errors::{CommunityError, CommunityResult};
use super::types::{AccessLevel, ChatId, CommunityId};
use serde::{Deserialize, Serialize};

/// Wallet account disclosed by the requester
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAccount {
    pub address: String,
    pub chain_ids: Vec<u64>,
    pub is_airdrop_address: bool,
}

/// A request to join the community, optionally scoped to one chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToJoin {
    pub community_id: CommunityId,
    pub clock: u64,

    /// Empty when the requester has no ENS name
    pub ens_name: String,

    pub chat_id: Option<ChatId>,
    pub revealed_accounts: Vec<RevealedAccount>,
}

impl RequestToJoin {
    pub fn new(community_id: CommunityId, clock: u64) -> Self {
        RequestToJoin {
            community_id,
            clock,
            ens_name: String::new(),
            chat_id: None,
            revealed_accounts: Vec::new(),
        }
    }

    pub fn for_chat(mut self, chat_id: impl Into<ChatId>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_ens_name(mut self, ens_name: impl Into<String>) -> Self {
        self.ens_name = ens_name.into();
        self
    }

    pub fn has_ens_name(&self) -> bool {
        !self.ens_name.is_empty()
    }
}

/// Whether a chat join request may be filed, given the community and chat access levels
pub fn chat_request_allowed(org: AccessLevel, chat: AccessLevel) -> CommunityResult<()> {
    use AccessLevel::*;

    match (org, chat) {
        (AutoAccept, ManualAccept) | (ManualAccept, ManualAccept) => Ok(()),
        (AutoAccept, AutoAccept)
        | (AutoAccept, InvitationOnly)
        | (InvitationOnly, AutoAccept)
        | (InvitationOnly, InvitationOnly)
        | (InvitationOnly, ManualAccept)
        | (ManualAccept, AutoAccept)
        | (ManualAccept, InvitationOnly) => Err(CommunityError::CantRequestAccess),
        (Unknown, _) => Err(CommunityError::UnknownOrgAccess),
        (_, Unknown) => Err(CommunityError::UnknownChatAccess),
    }
}

/// Whether a community join request may be filed for the given access level
pub fn org_request_allowed(org: AccessLevel) -> CommunityResult<()> {
    match org {
        AccessLevel::ManualAccept => Ok(()),
        AccessLevel::AutoAccept | AccessLevel::InvitationOnly => {
            Err(CommunityError::CantRequestAccess)
        }
        AccessLevel::Unknown => Err(CommunityError::UnknownOrgAccess),
    }
}
