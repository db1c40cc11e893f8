//! Community state machine
//!
//! A [`Community`] owns the local configuration and current description of
//! one community. Local mutations are checked against the device's authority,
//! applied to a working copy, validated and committed with a clock bump.
//! Remote descriptions are adopted only when their clock is newer.
//!
//! All state sits behind one `RwLock`. Commits are a single swap of the
//! working copy, so a poisoned lock never exposes a partial update and is
//! recovered rather than propagated.

use super::access;
use super::changes::{self, CommunityChanges};
use super::community_config::CommunityConfig;
use super::errors::{CommunityError, CommunityResult};
use super::permissions::{self, MessageKind, TokenPermissionIndex};
use super::projection::{self, CommunityView};
use super::request::{self, RequestToJoin};
use super::storage::DescriptionStore;
use super::time::TimeSource;
use super::types::{
    CategoryId, ChannelRole, Chat, ChatId, Category, CommunityId, Description, Member, MemberKey,
    Role, TokenPermission, TokenPermissionType,
};
use super::validator::validate_description;
use crate::config::LimitsConfig;
use crate::metrics::{
    Timer, MUTATIONS_COMMITTED, MUTATIONS_REJECTED, SNAPSHOTS_SAVED, UPDATES_ADOPTED,
    UPDATES_REJECTED, UPDATES_STALE, UPDATE_DURATION_MS,
};
use metrics::counter;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Where a remote description came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOrigin {
    /// Member key that signed the description. Verifying the signature is
    /// the caller's job.
    pub signer: MemberKey,

    /// Control node announced alongside the description, if it changed
    pub new_control_node: Option<MemberKey>,
}

impl UpdateOrigin {
    pub fn signed_by(signer: MemberKey) -> Self {
        UpdateOrigin {
            signer,
            new_control_node: None,
        }
    }

    pub fn with_control_node(mut self, control_node: MemberKey) -> Self {
        self.new_control_node = Some(control_node);
        self
    }
}

/// Authority a local mutation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Authority {
    /// Holds the community private key
    WriteKey,
    /// Is the control node
    ControlNode,
    /// Any configured member identity
    Member,
}

struct CommunityState {
    config: CommunityConfig,
    index: TokenPermissionIndex,
    updated_at: u64,
    synced_at: u64,
}

/// One community and everything this device knows about it
pub struct Community {
    id: CommunityId,
    inner: RwLock<CommunityState>,
    time_source: Arc<dyn TimeSource>,
    limits: LimitsConfig,
    span: tracing::Span,
}

impl Community {
    /// Wrap a configuration. The description is taken as-is; use
    /// [`validate_description`] first when it comes from an untrusted source.
    pub fn new(config: CommunityConfig, time_source: Arc<dyn TimeSource>) -> Self {
        let id = config.id;
        let index = TokenPermissionIndex::build(&config.description.token_permissions);
        let now = time_source.now_millis();

        Community {
            id,
            inner: RwLock::new(CommunityState {
                config,
                index,
                updated_at: now,
                synced_at: 0,
            }),
            time_source,
            limits: LimitsConfig::default(),
            span: tracing::info_span!("community", id = %id),
        }
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Rebuild a community from the newest of the stored snapshot and the
    /// description already carried by `config`
    pub fn restore(
        store: &dyn DescriptionStore,
        mut config: CommunityConfig,
        time_source: Arc<dyn TimeSource>,
    ) -> CommunityResult<Self> {
        if let Some(snapshot) = store.load(&config.id)? {
            if snapshot.clock > config.description.clock {
                validate_description(Some(&snapshot))?;
                debug!(
                    id = %config.id,
                    clock = snapshot.clock,
                    "Restored community description from snapshot"
                );
                config.description = snapshot;
            }
        }

        Ok(Self::new(config, time_source))
    }

    /// Write the current description to `store`. The lock is released before
    /// the store is called.
    pub fn persist(&self, store: &dyn DescriptionStore) -> CommunityResult<bool> {
        let _entered = self.span.enter();
        let snapshot = self.description();

        let saved = store.save(&self.id, &snapshot)?;
        if saved {
            counter!(SNAPSHOTS_SAVED).increment(1);
        }
        debug!(clock = snapshot.clock, saved, "Persisted community description");
        Ok(saved)
    }

    fn read(&self) -> RwLockReadGuard<'_, CommunityState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CommunityState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check authority, apply `mutation` to a working copy, validate it and
    /// commit it with the clock bumped by one
    fn commit<F>(
        &self,
        operation: &'static str,
        authority: Authority,
        mutation: F,
    ) -> CommunityResult<CommunityChanges>
    where
        F: FnOnce(&mut CommunityConfig) -> CommunityResult<()>,
    {
        let _entered = self.span.enter();
        let mut state = self.write();

        let authorized = match authority {
            Authority::WriteKey => access::has_write_authority(Some(&state.config)),
            Authority::ControlNode => access::is_control_node(Some(&state.config)),
            Authority::Member => true,
        };
        if !authorized {
            counter!(MUTATIONS_REJECTED, "operation" => operation).increment(1);
            warn!(operation, "Refused local mutation: not authorized");
            return Err(CommunityError::NotAuthorized);
        }

        let current_clock = state.config.description.clock;
        let mut working = state.config.clone();
        let applied = mutation(&mut working)
            .and_then(|()| validate_description(Some(&working.description)))
            .and_then(|()| {
                current_clock
                    .checked_add(1)
                    .ok_or(CommunityError::ClockExhausted(current_clock))
            });
        let next_clock = match applied {
            Ok(clock) => clock,
            Err(err) => {
                counter!(MUTATIONS_REJECTED, "operation" => operation).increment(1);
                debug!(operation, error = %err, "Local mutation failed");
                return Err(err);
            }
        };

        working.description.clock = next_clock;
        let changes = changes::diff(&state.config.description, &working.description);
        let reindex =
            working.description.token_permissions != state.config.description.token_permissions;

        state.config = working;
        if reindex {
            state.index = TokenPermissionIndex::build(&state.config.description.token_permissions);
        }
        state.updated_at = self.time_source.now_millis();

        counter!(MUTATIONS_COMMITTED, "operation" => operation).increment(1);
        info!(
            operation,
            clock = state.config.description.clock,
            "Committed local mutation"
        );

        Ok(changes)
    }

    fn check_chat_identity(&self, chat: &Chat) -> CommunityResult<()> {
        let name = chat.identity.display_name.trim();
        if name.is_empty() || name.chars().count() > self.limits.max_chat_name_length {
            return Err(CommunityError::InvalidChatName);
        }
        if chat.identity.description.chars().count() > self.limits.max_chat_description_length {
            return Err(CommunityError::ChatDescriptionTooLong);
        }
        Ok(())
    }

    // ===== Local mutations =====

    /// Create a chat. Its position is the number of chats before it.
    pub fn create_chat(
        &self,
        chat_id: impl Into<ChatId>,
        mut chat: Chat,
    ) -> CommunityResult<CommunityChanges> {
        let chat_id = chat_id.into();

        self.commit("create_chat", Authority::WriteKey, |config| {
            self.check_chat_identity(&chat)?;
            let chats = &mut config.description.chats;

            if chats
                .values()
                .any(|existing| existing.identity.display_name == chat.identity.display_name)
            {
                return Err(CommunityError::DuplicateChatName);
            }
            if chats.contains_key(&chat_id) {
                return Err(CommunityError::ChatAlreadyExists(chat_id.clone()));
            }
            if let Some(category_id) = &chat.category_id {
                if !config.description.categories.contains_key(category_id) {
                    return Err(CommunityError::CategoryNotFound(category_id.clone()));
                }
            }

            chat.position = config.description.chats.len() as u32;
            config.description.chats.insert(chat_id.clone(), chat);
            Ok(())
        })
    }

    /// Replace the identity, permissions and display flags of a chat.
    /// Members, position and category are kept.
    pub fn edit_chat(&self, chat_id: &str, chat: Chat) -> CommunityResult<CommunityChanges> {
        self.commit("edit_chat", Authority::WriteKey, |config| {
            self.check_chat_identity(&chat)?;
            let chats = &mut config.description.chats;

            if chats.iter().any(|(id, existing)| {
                id != chat_id && existing.identity.display_name == chat.identity.display_name
            }) {
                return Err(CommunityError::DuplicateChatName);
            }

            let existing = chats
                .get_mut(chat_id)
                .ok_or_else(|| CommunityError::ChatNotFound(chat_id.to_string()))?;
            existing.identity = chat.identity;
            existing.permissions = chat.permissions;
            existing.hide_if_permissions_not_met = chat.hide_if_permissions_not_met;
            existing.viewers_can_post_reactions = chat.viewers_can_post_reactions;
            Ok(())
        })
    }

    /// Delete a chat, closing the gap it leaves in its category's ordering
    pub fn delete_chat(&self, chat_id: &str) -> CommunityResult<CommunityChanges> {
        self.commit("delete_chat", Authority::WriteKey, |config| {
            let chats = &mut config.description.chats;
            let removed = chats
                .remove(chat_id)
                .ok_or_else(|| CommunityError::ChatNotFound(chat_id.to_string()))?;

            for chat in chats.values_mut() {
                if chat.category_id == removed.category_id && chat.position > removed.position {
                    chat.position -= 1;
                }
            }
            Ok(())
        })
    }

    pub fn remove_member_from_chat(
        &self,
        member: &MemberKey,
        chat_id: &str,
    ) -> CommunityResult<CommunityChanges> {
        self.commit("remove_member_from_chat", Authority::WriteKey, |config| {
            let chat = config
                .description
                .chats
                .get_mut(chat_id)
                .ok_or_else(|| CommunityError::ChatNotFound(chat_id.to_string()))?;

            chat.members
                .remove(member)
                .map(|_| ())
                .ok_or(CommunityError::MemberNotFound)
        })
    }

    /// Remove a member from the community and from every chat
    pub fn remove_member_from_org(&self, member: &MemberKey) -> CommunityResult<CommunityChanges> {
        let owner = self.id.owner_key();

        self.commit("remove_member_from_org", Authority::WriteKey, |config| {
            remove_member(&mut config.description, &owner, member)
        })
    }

    /// Leave the community as the local member identity.
    ///
    /// Needs no write authority; only the local replica changes until the
    /// control node publishes a description without us.
    pub fn remove_self_from_org(&self) -> CommunityResult<CommunityChanges> {
        let owner = self.id.owner_key();

        self.commit("remove_self_from_org", Authority::Member, |config| {
            let member = config.member_key().ok_or(CommunityError::NotAuthorized)?;
            if member == owner {
                return Err(CommunityError::CannotRemoveOwner);
            }

            if config.description.has_member(&member) {
                remove_member(&mut config.description, &owner, &member)?;
            }
            config.joined = false;
            Ok(())
        })
    }

    /// Add a member to the community, or replace its roles if already present
    pub fn add_member(&self, key: MemberKey, member: Member) -> CommunityResult<CommunityChanges> {
        self.commit("add_member", Authority::WriteKey, |config| {
            config.description.members.insert(key, member);
            Ok(())
        })
    }

    /// Add an existing community member to a chat
    pub fn add_member_to_chat(
        &self,
        key: MemberKey,
        chat_id: &str,
        channel_role: ChannelRole,
    ) -> CommunityResult<CommunityChanges> {
        self.commit("add_member_to_chat", Authority::WriteKey, |config| {
            if !config.description.has_member(&key) {
                return Err(CommunityError::MemberNotFound);
            }

            let chat = config
                .description
                .chats
                .get_mut(chat_id)
                .ok_or_else(|| CommunityError::ChatNotFound(chat_id.to_string()))?;
            chat.members
                .insert(key, Member::new().with_channel_role(channel_role));
            Ok(())
        })
    }

    /// Replace the roles of a member. Role changes are not reported in the
    /// returned changes.
    pub fn set_member_roles(
        &self,
        key: &MemberKey,
        roles: BTreeSet<Role>,
    ) -> CommunityResult<CommunityChanges> {
        self.commit("set_member_roles", Authority::WriteKey, |config| {
            let member = config
                .description
                .members
                .get_mut(key)
                .ok_or(CommunityError::MemberNotFound)?;
            member.roles = roles;
            Ok(())
        })
    }

    /// Create a category and move the listed chats into it, in order
    pub fn create_category(
        &self,
        category_id: impl Into<CategoryId>,
        name: impl Into<String>,
        chat_ids: &[ChatId],
    ) -> CommunityResult<CommunityChanges> {
        let category_id = category_id.into();
        let name = name.into();

        self.commit("create_category", Authority::WriteKey, |config| {
            let description = &mut config.description;
            if description.categories.contains_key(&category_id) {
                return Err(CommunityError::CategoryAlreadyExists(category_id.clone()));
            }

            for (position, chat_id) in chat_ids.iter().enumerate() {
                let chat = description
                    .chats
                    .get_mut(chat_id)
                    .ok_or_else(|| CommunityError::ChatNotFound(chat_id.clone()))?;
                chat.category_id = Some(category_id.clone());
                chat.position = position as u32;
            }

            let category = Category {
                id: category_id.clone(),
                name,
                position: description.categories.len() as u32,
            };
            description.categories.insert(category_id.clone(), category);
            Ok(())
        })
    }

    /// Delete a category; its chats become uncategorised
    pub fn delete_category(&self, category_id: &str) -> CommunityResult<CommunityChanges> {
        self.commit("delete_category", Authority::WriteKey, |config| {
            let description = &mut config.description;
            let removed = description
                .categories
                .remove(category_id)
                .ok_or_else(|| CommunityError::CategoryNotFound(category_id.to_string()))?;

            for category in description.categories.values_mut() {
                if category.position > removed.position {
                    category.position -= 1;
                }
            }
            for chat in description.chats.values_mut() {
                if chat.category_id.as_deref() == Some(category_id) {
                    chat.category_id = None;
                }
            }
            Ok(())
        })
    }

    /// Insert or replace a token permission by id. An empty id gets a fresh one.
    pub fn upsert_token_permission(
        &self,
        mut permission: TokenPermission,
    ) -> CommunityResult<CommunityChanges> {
        if permission.id.is_empty() {
            permission.id = uuid::Uuid::new_v4().to_string();
        }

        self.commit("upsert_token_permission", Authority::WriteKey, |config| {
            let permissions = &mut config.description.token_permissions;
            match permissions.iter_mut().find(|p| p.id == permission.id) {
                Some(existing) => *existing = permission,
                None => permissions.push(permission),
            }
            Ok(())
        })
    }

    pub fn delete_token_permission(&self, id: &str) -> CommunityResult<CommunityChanges> {
        self.commit("delete_token_permission", Authority::WriteKey, |config| {
            let permissions = &mut config.description.token_permissions;
            let position = permissions
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| CommunityError::TokenPermissionNotFound(id.to_string()))?;
            permissions.remove(position);
            Ok(())
        })
    }

    // ===== Requests to join =====

    /// Decide whether `request` may be accepted by this device
    pub fn validate_request_to_join(
        &self,
        signer: &MemberKey,
        request: &RequestToJoin,
    ) -> CommunityResult<()> {
        let _entered = self.span.enter();
        let state = self.read();
        let result = check_request_to_join(&state.config, request);

        match &result {
            Ok(()) => debug!(signer = %signer, chat = ?request.chat_id, "Request to join is valid"),
            Err(err) => {
                debug!(signer = %signer, chat = ?request.chat_id, error = %err, "Request to join refused")
            }
        }
        result
    }

    /// Validate `request` and admit `signer` to the community and to the
    /// requested chat
    pub fn accept_request_to_join(
        &self,
        signer: &MemberKey,
        request: &RequestToJoin,
    ) -> CommunityResult<CommunityChanges> {
        self.commit("accept_request_to_join", Authority::ControlNode, |config| {
            check_request_to_join(config, request)?;

            let description = &mut config.description;
            description
                .members
                .entry(signer.clone())
                .or_insert_with(Member::new);

            if let Some(chat_id) = &request.chat_id {
                let chat = description
                    .chats
                    .get_mut(chat_id)
                    .ok_or_else(|| CommunityError::ChatNotFound(chat_id.clone()))?;
                chat.members.entry(signer.clone()).or_insert_with(Member::new);
            }
            Ok(())
        })
    }

    // ===== Remote updates =====

    /// Apply a description received from the network.
    ///
    /// Returns `Ok(None)` when the candidate is not newer than the current
    /// description. An invalid candidate is refused with the validator's
    /// error and leaves the community unchanged.
    pub fn update_description(
        &self,
        candidate: Description,
        origin: UpdateOrigin,
    ) -> CommunityResult<Option<CommunityChanges>> {
        let _entered = self.span.enter();
        let timer = Timer::new(UPDATE_DURATION_MS);
        let mut state = self.write();

        let current_clock = state.config.description.clock;
        if candidate.clock <= current_clock {
            counter!(UPDATES_STALE).increment(1);
            debug!(
                signer = %origin.signer,
                clock = candidate.clock,
                current_clock,
                "Ignoring stale community description"
            );
            timer.stop("stale");
            return Ok(None);
        }

        if let Err(err) = validate_description(Some(&candidate)) {
            counter!(UPDATES_REJECTED).increment(1);
            warn!(
                signer = %origin.signer,
                clock = candidate.clock,
                error = %err,
                "Rejected invalid community description"
            );
            timer.stop("rejected");
            return Err(err);
        }

        let changes = changes::diff(&state.config.description, &candidate);
        let reindex = candidate.token_permissions != state.config.description.token_permissions;

        state.config.description = candidate;
        if let Some(control_node) = origin.new_control_node {
            state.config.control_node = Some(control_node);
        }
        if reindex {
            state.index = TokenPermissionIndex::build(&state.config.description.token_permissions);
        }
        let now = self.time_source.now_millis();
        state.updated_at = now;
        state.synced_at = now;

        counter!(UPDATES_ADOPTED).increment(1);
        info!(
            signer = %origin.signer,
            clock = state.config.description.clock,
            previous_clock = current_clock,
            "Adopted community description"
        );
        drop(state);
        timer.stop("adopted");

        Ok(Some(changes))
    }

    // ===== Queries =====

    pub fn id(&self) -> CommunityId {
        self.id
    }

    /// Full chat id of a channel: community id hex followed by the channel id
    pub fn chat_id(&self, channel_id: &str) -> String {
        format!("{}{}", self.id, channel_id)
    }

    pub fn description(&self) -> Description {
        self.read().config.description.clone()
    }

    pub fn clock(&self) -> u64 {
        self.read().config.description.clock
    }

    pub fn members(&self) -> BTreeMap<MemberKey, Member> {
        self.read().config.description.members.clone()
    }

    pub fn chats(&self) -> BTreeMap<ChatId, Chat> {
        self.read().config.description.chats.clone()
    }

    pub fn chat_ids(&self) -> Vec<ChatId> {
        self.read().config.description.chats.keys().cloned().collect()
    }

    pub fn chat(&self, chat_id: &str) -> Option<Chat> {
        self.read().config.description.chats.get(chat_id).cloned()
    }

    pub fn categories(&self) -> BTreeMap<CategoryId, Category> {
        self.read().config.description.categories.clone()
    }

    pub fn token_permissions(&self) -> Vec<TokenPermission> {
        self.read().config.description.token_permissions.clone()
    }

    pub fn has_member(&self, key: &MemberKey) -> bool {
        self.read().config.description.has_member(key)
    }

    pub fn is_member_in_chat(&self, key: &MemberKey, chat_id: &str) -> bool {
        self.read()
            .config
            .description
            .chats
            .get(chat_id)
            .map(|chat| chat.is_member(key))
            .unwrap_or(false)
    }

    pub fn has_write_authority(&self) -> bool {
        access::has_write_authority(Some(&self.read().config))
    }

    pub fn is_control_node(&self) -> bool {
        access::is_control_node(Some(&self.read().config))
    }

    pub fn control_node(&self) -> Option<MemberKey> {
        self.read().config.control_node.clone()
    }

    pub fn joined(&self) -> bool {
        self.read().config.joined
    }

    /// Wall-clock millis of the last committed change
    pub fn updated_at(&self) -> u64 {
        self.read().updated_at
    }

    /// Wall-clock millis of the last adopted remote description; 0 if none
    pub fn synced_at(&self) -> u64 {
        self.read().synced_at
    }

    pub fn can_view(&self, actor: &MemberKey, chat_id: &str) -> bool {
        let state = self.read();
        permissions::can_view(&state.config.description, &self.id, actor, chat_id)
    }

    pub fn can_post(
        &self,
        actor: &MemberKey,
        chat_id: &str,
        kind: MessageKind,
    ) -> CommunityResult<bool> {
        let state = self.read();
        permissions::can_post(
            &state.config.description,
            &self.id,
            state.config.control_node.as_ref(),
            actor,
            chat_id,
            kind,
        )
    }

    /// Whether the channel is token-gated
    pub fn channel_encrypted(&self, channel_id: &str) -> bool {
        let chat_id = self.chat_id(channel_id);
        self.read().index.is_encrypted(&chat_id)
    }

    /// Token permissions of `permission_type` referencing the full `chat_id`
    pub fn permissions_by_type(
        &self,
        chat_id: &str,
        permission_type: TokenPermissionType,
    ) -> Vec<TokenPermission> {
        self.read().index.by_type(chat_id, permission_type)
    }

    /// Presentation view evaluated for the local member identity
    pub fn projection(&self) -> CommunityView {
        let state = self.read();
        projection::project(&state.config, &state.index)
    }

    pub fn to_json(&self) -> CommunityResult<String> {
        Ok(serde_json::to_string(&self.projection())?)
    }
}

impl std::fmt::Debug for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Community")
            .field("config", &state.config)
            .field("updated_at", &state.updated_at)
            .field("synced_at", &state.synced_at)
            .finish()
    }
}

/// Remove `member` from the community and every chat
fn remove_member(
    description: &mut Description,
    owner: &MemberKey,
    member: &MemberKey,
) -> CommunityResult<()> {
    if member == owner || access::is_owner(description.members.get(member)) {
        return Err(CommunityError::CannotRemoveOwner);
    }

    description
        .members
        .remove(member)
        .ok_or(CommunityError::MemberNotFound)?;
    for chat in description.chats.values_mut() {
        chat.members.remove(member);
    }
    Ok(())
}

fn check_request_to_join(config: &CommunityConfig, request: &RequestToJoin) -> CommunityResult<()> {
    if !access::is_control_node(Some(config)) {
        return Err(CommunityError::NotAdmin);
    }

    if request.community_id != config.id {
        return Err(CommunityError::InvalidRequestToJoin(format!(
            "request targets community {}",
            request.community_id
        )));
    }

    let description = &config.description;
    let org = description
        .permissions
        .ok_or(CommunityError::NoOrgPermissions)?;

    match &request.chat_id {
        Some(chat_id) => {
            let chat = description
                .chats
                .get(chat_id)
                .ok_or_else(|| CommunityError::ChatNotFound(chat_id.clone()))?;
            let chat_permissions = chat.permissions.unwrap_or_default();

            if (org.ens_only || chat_permissions.ens_only) && !request.has_ens_name() {
                return Err(CommunityError::CantRequestAccess);
            }

            request::chat_request_allowed(org.access, chat_permissions.access)
        }
        None => {
            if org.ens_only && !request.has_ens_name() {
                return Err(CommunityError::CantRequestAccess);
            }

            request::org_request_allowed(org.access)
        }
    }
}
