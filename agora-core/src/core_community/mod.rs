//! Community state and permission engine
//!
//! Owns the replicated description of a community (members, chats,
//! categories, access rules and token-gating rules), enforces who may change
//! it, resolves remote updates by Lamport clock and reports what changed.
//!
//! Leaves first:
//!
//! - [`access`]: role and authority predicates
//! - [`validator`]: structural validation of descriptions
//! - [`permissions`]: view/post checks and token-permission indexing
//! - [`changes`]: diffs between description versions
//! - [`Community`]: the state machine tying them together
//!
//! ## Example
//!
//! ```
//! use agora_core::core_community::{
//!     AccessLevel, Chat, ChatIdentity, Community, CommunityConfig, CommunityPermissions,
//!     Description, SystemTimeSource,
//! };
//! use ed25519_dalek::SigningKey;
//! use std::sync::Arc;
//!
//! let key = SigningKey::from_bytes(&[7u8; 32]);
//! let description = Description::new(CommunityPermissions::with_access(AccessLevel::ManualAccept));
//! let community = Community::new(
//!     CommunityConfig::for_owner(key, description),
//!     Arc::new(SystemTimeSource),
//! );
//!
//! let general = Chat::new(
//!     ChatIdentity::named("general"),
//!     CommunityPermissions::with_access(AccessLevel::AutoAccept),
//! );
//! let changes = community.create_chat("general", general).unwrap();
//! assert!(changes.chats_added.contains_key("general"));
//! assert_eq!(community.clock(), 1);
//! ```

pub mod access;
pub mod changes;
pub mod community;
pub mod community_config;
pub mod errors;
pub mod permissions;
pub mod projection;
pub mod request;
pub mod storage;
pub mod time;
pub mod types;
pub mod validator;

pub use changes::{diff, ChatChanges, CommunityChanges};
pub use community::{Community, UpdateOrigin};
pub use community_config::CommunityConfig;
pub use errors::{CommunityError, CommunityResult};
pub use permissions::{MessageKind, TokenPermissionIndex};
pub use projection::{ChatView, CommunityView};
pub use request::{RequestToJoin, RevealedAccount};
pub use storage::{DescriptionStore, MemoryDescriptionStore, SqliteDescriptionStore};
pub use time::{SystemTimeSource, TimeSource};
pub use types::*;
pub use validator::validate_description;
