//! Community operation errors

use super::types::ChatId;
use thiserror::Error;

/// Errors returned by the community engine.
///
/// Every failing operation leaves the community unchanged.
#[derive(Debug, Error)]
pub enum CommunityError {
    #[error("Not authorized to modify this community")]
    NotAuthorized,

    #[error("Not the control node of this community")]
    NotAdmin,

    #[error("Access to this community or chat can't be requested")]
    CantRequestAccess,

    #[error("Chat not found: {0}")]
    ChatNotFound(ChatId),

    #[error("Invalid community description")]
    InvalidDescription,

    #[error("Community has no permissions")]
    NoOrgPermissions,

    #[error("Chat has no permissions")]
    NoChatPermissions,

    #[error("Unknown community access level")]
    UnknownOrgAccess,

    #[error("Unknown chat access level")]
    UnknownChatAccess,

    #[error("Member is in a chat but not in the community")]
    MemberInChatButNotInOrg,

    #[error("Chat already exists: {0}")]
    ChatAlreadyExists(ChatId),

    #[error("A chat with this name already exists")]
    DuplicateChatName,

    #[error("Invalid chat name")]
    InvalidChatName,

    #[error("Chat description is too long")]
    ChatDescriptionTooLong,

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category already exists: {0}")]
    CategoryAlreadyExists(String),

    #[error("Member not found")]
    MemberNotFound,

    #[error("Cannot remove the community owner")]
    CannotRemoveOwner,

    #[error("Token permission not found: {0}")]
    TokenPermissionNotFound(String),

    #[error("Invalid request to join: {0}")]
    InvalidRequestToJoin(String),

    #[error("Description clock {0} cannot advance")]
    ClockExhausted(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for CommunityError {
    fn from(err: rusqlite::Error) -> Self {
        CommunityError::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for CommunityError {
    fn from(err: r2d2::Error) -> Self {
        CommunityError::Storage(format!("Connection pool error: {}", err))
    }
}

/// Result type for community operations
pub type CommunityResult<T> = Result<T, CommunityError>;
