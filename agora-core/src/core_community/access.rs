//! Role and authority checks
//!
//! Pure functions over member role sets and the local device configuration.
//! Owner implies admin and admin implies member when checked; the stored
//! role set does not need to carry the implied roles.

use super::community_config::CommunityConfig;
use super::types::{CommunityId, Member, Role};

/// Whether `member` holds `role`, taking implied roles into account
pub fn has_role(member: Option<&Member>, role: Role) -> bool {
    let Some(member) = member else {
        return false;
    };

    match role {
        Role::Owner => member.roles.contains(&Role::Owner),
        Role::Admin => {
            member.roles.contains(&Role::Owner) || member.roles.contains(&Role::Admin)
        }
        Role::Member => true,
    }
}

pub fn is_owner(member: Option<&Member>) -> bool {
    has_role(member, Role::Owner)
}

pub fn is_admin(member: Option<&Member>) -> bool {
    has_role(member, Role::Admin)
}

/// True iff the config holds the private key the community id was derived from.
///
/// This is the only source of local write authority; the member role map is
/// not consulted.
pub fn has_write_authority(config: Option<&CommunityConfig>) -> bool {
    let Some(config) = config else {
        return false;
    };

    match &config.private_key {
        Some(key) => CommunityId::from_public_key(&key.verifying_key()) == config.id,
        None => false,
    }
}

/// True if this device may publish descriptions and decide requests to join
pub fn is_control_node(config: Option<&CommunityConfig>) -> bool {
    if has_write_authority(config) {
        return true;
    }

    let Some(config) = config else {
        return false;
    };

    if !config.control_device {
        return false;
    }

    match (config.member_key(), &config.control_node) {
        (Some(identity), Some(control_node)) => &identity == control_node,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_community::types::{Description, MemberKey};
    use ed25519_dalek::SigningKey;

    fn owner_key() -> SigningKey {
        SigningKey::from_bytes(&[1u8; 32])
    }

    #[test]
    fn test_missing_member_has_no_role() {
        assert!(!has_role(None, Role::Member));
        assert!(!is_owner(None));
        assert!(!is_admin(None));
    }

    #[test]
    fn test_owner_implies_admin() {
        let owner = Member::with_roles([Role::Owner]);
        assert!(is_owner(Some(&owner)));
        assert!(is_admin(Some(&owner)));
        assert!(has_role(Some(&owner), Role::Member));
    }

    #[test]
    fn test_admin_is_not_owner() {
        let admin = Member::with_roles([Role::Admin]);
        assert!(is_admin(Some(&admin)));
        assert!(!is_owner(Some(&admin)));
    }

    #[test]
    fn test_plain_member() {
        let member = Member::new();
        assert!(has_role(Some(&member), Role::Member));
        assert!(!is_admin(Some(&member)));
    }

    #[test]
    fn test_write_authority_requires_matching_key() {
        let key = owner_key();
        let config = CommunityConfig::for_owner(key.clone(), Description::default());
        assert!(has_write_authority(Some(&config)));

        let id = CommunityId::from_public_key(&key.verifying_key());
        let other = SigningKey::from_bytes(&[2u8; 32]);
        let mismatched = CommunityConfig::new(id, Description::default()).with_private_key(other);
        assert!(!has_write_authority(Some(&mismatched)));

        let no_key = CommunityConfig::new(id, Description::default());
        assert!(!has_write_authority(Some(&no_key)));
        assert!(!has_write_authority(None));
    }

    #[test]
    fn test_control_device_is_control_node() {
        let id = CommunityId::from_public_key(&owner_key().verifying_key());
        let device = SigningKey::from_bytes(&[3u8; 32]);
        let device_key = MemberKey::from_public_key(&device.verifying_key());

        let config = CommunityConfig::new(id, Description::default())
            .with_member_identity(device)
            .with_control_node(device_key)
            .with_control_device(true);
        assert!(!has_write_authority(Some(&config)));
        assert!(is_control_node(Some(&config)));

        let not_flagged = config.clone().with_control_device(false);
        assert!(!is_control_node(Some(&not_flagged)));
    }

    #[test]
    fn test_control_node_must_match_identity() {
        let id = CommunityId::from_public_key(&owner_key().verifying_key());
        let config = CommunityConfig::new(id, Description::default())
            .with_member_identity(SigningKey::from_bytes(&[3u8; 32]))
            .with_control_node(MemberKey::new("ffff"))
            .with_control_device(true);
        assert!(!is_control_node(Some(&config)));
    }
}
