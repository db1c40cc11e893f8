//! Structural validation of community descriptions
//!
//! Checks run in a fixed order and stop at the first failure, so every
//! replica reports the same error for the same candidate.

use super::errors::{CommunityError, CommunityResult};
use super::types::Description;

/// Validate a candidate description without mutating it
pub fn validate_description(description: Option<&Description>) -> CommunityResult<()> {
    let description = description.ok_or(CommunityError::InvalidDescription)?;

    let permissions = description
        .permissions
        .as_ref()
        .ok_or(CommunityError::NoOrgPermissions)?;

    if !permissions.access.is_known() {
        return Err(CommunityError::UnknownOrgAccess);
    }

    if description.chats.values().any(|chat| chat.permissions.is_none()) {
        return Err(CommunityError::NoChatPermissions);
    }

    if description.chats.values().any(|chat| !chat.access().is_known()) {
        return Err(CommunityError::UnknownChatAccess);
    }

    for chat in description.chats.values() {
        if chat.members.keys().any(|key| !description.members.contains_key(key)) {
            return Err(CommunityError::MemberInChatButNotInOrg);
        }
    }

    Ok(())
}
