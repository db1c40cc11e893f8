//! Local device configuration of one community

use super::types::{CommunityId, Description, MemberKey};
use ed25519_dalek::SigningKey;
use std::fmt;

/// Everything this device knows about one community: its identity, the keys
/// it holds and the current description.
///
/// Exclusively owned by a single [`super::Community`].
#[derive(Clone)]
pub struct CommunityConfig {
    /// Immutable community identifier
    pub id: CommunityId,

    /// Community private key; present only on the owning device
    pub private_key: Option<SigningKey>,

    /// Key of the local member identity
    pub member_identity: Option<SigningKey>,

    /// Member key of the device currently acting as control node
    pub control_node: Option<MemberKey>,

    /// This device has been designated as control node
    pub control_device: bool,

    /// The local identity has joined the community
    pub joined: bool,

    pub description: Description,
}

impl CommunityConfig {
    /// Config of a replica that holds no keys
    pub fn new(id: CommunityId, description: Description) -> Self {
        CommunityConfig {
            id,
            private_key: None,
            member_identity: None,
            control_node: None,
            control_device: false,
            joined: false,
            description,
        }
    }

    /// Config of the device that created the community
    pub fn for_owner(private_key: SigningKey, description: Description) -> Self {
        let verifying = private_key.verifying_key();
        let id = CommunityId::from_public_key(&verifying);

        CommunityConfig {
            id,
            member_identity: Some(private_key.clone()),
            private_key: Some(private_key),
            control_node: Some(MemberKey::from_public_key(&verifying)),
            control_device: true,
            joined: true,
            description,
        }
    }

    pub fn with_private_key(mut self, key: SigningKey) -> Self {
        self.private_key = Some(key);
        self
    }

    pub fn with_member_identity(mut self, key: SigningKey) -> Self {
        self.member_identity = Some(key);
        self
    }

    pub fn with_control_node(mut self, control_node: MemberKey) -> Self {
        self.control_node = Some(control_node);
        self
    }

    pub fn with_control_device(mut self, control_device: bool) -> Self {
        self.control_device = control_device;
        self
    }

    pub fn with_joined(mut self, joined: bool) -> Self {
        self.joined = joined;
        self
    }

    /// Member key of the local identity, if one is configured
    pub fn member_key(&self) -> Option<MemberKey> {
        self.member_identity
            .as_ref()
            .map(|key| MemberKey::from_public_key(&key.verifying_key()))
    }
}

impl fmt::Debug for CommunityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommunityConfig")
            .field("id", &self.id.to_string())
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("member", &self.member_key())
            .field("control_node", &self.control_node)
            .field("control_device", &self.control_device)
            .field("joined", &self.joined)
            .field("clock", &self.description.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_owner_derives_id_and_identity() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let config = CommunityConfig::for_owner(key.clone(), Description::default());

        assert_eq!(config.id, CommunityId::from_public_key(&key.verifying_key()));
        assert_eq!(config.member_key(), Some(config.id.owner_key()));
        assert!(config.joined);
        assert!(config.control_device);
    }

    #[test]
    fn test_debug_redacts_keys() {
        let key = SigningKey::from_bytes(&[9u8; 32]);
        let config = CommunityConfig::for_owner(key.clone(), Description::default());

        let debug = format!("{:?}", config);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&hex::encode(key.to_bytes())));
    }

    #[test]
    fn test_replica_has_no_member_key() {
        let id = CommunityId::from_bytes([4u8; 32]);
        let config = CommunityConfig::new(id, Description::default());
        assert_eq!(config.member_key(), None);
        assert!(!config.joined);
    }
}
