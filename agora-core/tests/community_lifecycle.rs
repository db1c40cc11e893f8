//! End-to-end community lifecycle: owner mutations, replica sync, posting rules

use agora_core::core_community::{
    AccessLevel, ChannelRole, Chat, ChatIdentity, Community, CommunityError,
    CommunityPermissions, Member, MemberKey, MessageKind, TokenCriteria, TokenPermission,
    TokenPermissionType, UpdateOrigin,
};
use agora_core::test_utils::{
    assert_chat_modified, assert_converged, assert_member_outside_chat, community_id, member_key,
    owner_config, replica_config, FixedTimeSource, OWNER_SEED,
};
use std::sync::Arc;

fn chat(name: &str, access: AccessLevel) -> Chat {
    Chat::new(ChatIdentity::named(name), CommunityPermissions::with_access(access))
}

fn sync(from: &Community, to: &Community) {
    to.update_description(
        from.description(),
        UpdateOrigin::signed_by(member_key(OWNER_SEED)),
    )
    .expect("valid description");
}

#[test]
fn test_owner_and_replica_lifecycle() {
    let owner = Community::new(owner_config(), Arc::new(FixedTimeSource::new(100)));
    let replica = Community::new(replica_config(2), Arc::new(FixedTimeSource::new(200)));

    // Owner creates a chat
    let changes = owner
        .create_chat("general", chat("general", AccessLevel::ManualAccept))
        .unwrap();
    assert!(changes.chats_added.contains_key("general"));

    // A device without the community key cannot edit it
    let mut edited = chat("general", AccessLevel::ManualAccept);
    edited.identity.emoji = "🤘".to_string();
    sync(&owner, &replica);
    let clock = replica.clock();
    assert!(matches!(
        replica.edit_chat("general", edited.clone()),
        Err(CommunityError::NotAuthorized)
    ));
    assert_eq!(replica.clock(), clock);

    // The owner can, and the change reports the new chat without member churn
    let changes = owner.edit_chat("general", edited).unwrap();
    let modified = assert_chat_modified(&changes, "general");
    assert_eq!(modified.chat_modified.as_ref().unwrap().identity.emoji, "🤘");
    assert!(modified.members_added.is_empty());
    assert!(modified.members_removed.is_empty());

    // Member M joins the community and the chat, then is removed from the chat only
    let m = member_key(2);
    owner.add_member(m.clone(), Member::new()).unwrap();
    owner
        .add_member_to_chat(m.clone(), "general", ChannelRole::Inherit)
        .unwrap();
    let changes = owner.remove_member_from_chat(&m, "general").unwrap();
    assert!(assert_chat_modified(&changes, "general")
        .members_removed
        .contains_key(&m));
    assert!(changes.members_removed.is_empty());
    assert_member_outside_chat(&owner, &m, "general");

    // The replica catches up to the same state
    sync(&owner, &replica);
    assert_converged(&owner, &replica);
    assert_eq!(replica.updated_at(), 200);
    assert_member_outside_chat(&replica, &m, "general");
}

#[test]
fn test_post_permissions() {
    let owner = Community::new(owner_config(), Arc::new(FixedTimeSource::new(0)));
    let poster = member_key(2);
    let viewer = member_key(3);
    let outsider = member_key(4);

    owner
        .create_chat("general", chat("general", AccessLevel::ManualAccept))
        .unwrap();
    owner.add_member(poster.clone(), Member::new()).unwrap();
    owner.add_member(viewer.clone(), Member::new()).unwrap();
    owner
        .add_member_to_chat(poster.clone(), "general", ChannelRole::Inherit)
        .unwrap();
    owner
        .add_member_to_chat(viewer.clone(), "general", ChannelRole::Viewer)
        .unwrap();

    let post = |actor: &MemberKey| owner.can_post(actor, "general", MessageKind::ChatMessage).unwrap();

    assert!(post(&community_id().owner_key()));
    assert!(post(&poster));
    assert!(!post(&viewer));
    assert!(!post(&outsider));

    assert!(owner.can_view(&viewer, "general"));
    assert!(!owner.can_view(&outsider, "general"));

    assert!(matches!(
        owner.can_post(&poster, "missing", MessageKind::ChatMessage),
        Err(CommunityError::ChatNotFound(_))
    ));
}

#[test]
fn test_channel_encryption_follows_token_permissions() {
    let owner = Community::new(owner_config(), Arc::new(FixedTimeSource::new(0)));
    owner
        .create_chat("vip", chat("vip", AccessLevel::AutoAccept))
        .unwrap();
    let chat_id = owner.chat_id("vip");
    assert_eq!(chat_id, format!("{}vip", community_id()));

    let gated = TokenPermission::new("a", TokenPermissionType::CanViewAndPostChannel)
        .for_chats([chat_id.clone()]);
    owner.upsert_token_permission(gated).unwrap();
    assert!(owner.channel_encrypted("vip"));

    let view_with_token = TokenPermission::new("b", TokenPermissionType::CanViewChannel)
        .for_chats([chat_id.clone()])
        .with_criteria(vec![TokenCriteria {
            symbol: "SNT".to_string(),
            amount: "10".to_string(),
            ..Default::default()
        }]);
    owner.upsert_token_permission(view_with_token).unwrap();
    assert!(owner.channel_encrypted("vip"));

    let open_view =
        TokenPermission::new("c", TokenPermissionType::CanViewChannel).for_chats([chat_id.clone()]);
    owner.upsert_token_permission(open_view).unwrap();
    assert!(!owner.channel_encrypted("vip"));

    assert_eq!(
        owner
            .permissions_by_type(&chat_id, TokenPermissionType::CanViewChannel)
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>(),
        vec!["b", "c"]
    );

    owner.delete_token_permission("c").unwrap();
    assert!(owner.channel_encrypted("vip"));
}

#[test]
fn test_projection_for_replica_member() {
    let owner = Community::new(owner_config(), Arc::new(FixedTimeSource::new(0)));
    let replica = Community::new(
        replica_config(2).with_joined(true),
        Arc::new(FixedTimeSource::new(0)),
    );

    owner
        .create_chat("general", chat("general", AccessLevel::AutoAccept))
        .unwrap();
    owner.add_member(member_key(2), Member::new()).unwrap();
    owner
        .add_member_to_chat(member_key(2), "general", ChannelRole::Viewer)
        .unwrap();
    sync(&owner, &replica);

    let view = replica.projection();
    let general = &view.chats["general"];
    assert!(general.can_view);
    assert!(!general.can_post);
    assert!(!view.admin);
    assert!(view.joined);
    assert!(!view.is_control_node);

    let json: serde_json::Value = serde_json::from_str(&replica.to_json().unwrap()).unwrap();
    assert_eq!(json["chats"]["general"]["canPost"], false);
    assert_eq!(json["chats"]["general"]["canView"], true);
    assert_eq!(json["id"], community_id().to_string());
}

#[test]
fn test_leaving_the_community() {
    let owner = Community::new(owner_config(), Arc::new(FixedTimeSource::new(0)));
    let replica = Community::new(
        replica_config(2).with_joined(true),
        Arc::new(FixedTimeSource::new(0)),
    );
    owner
        .create_chat("general", chat("general", AccessLevel::AutoAccept))
        .unwrap();
    owner.add_member(member_key(2), Member::new()).unwrap();
    owner
        .add_member_to_chat(member_key(2), "general", ChannelRole::Inherit)
        .unwrap();
    sync(&owner, &replica);

    let clock = replica.clock();
    let changes = replica.remove_self_from_org().unwrap();

    assert!(changes.members_removed.contains_key(&member_key(2)));
    assert!(assert_chat_modified(&changes, "general")
        .members_removed
        .contains_key(&member_key(2)));
    assert!(!replica.joined());
    assert!(!replica.has_member(&member_key(2)));
    assert_eq!(replica.clock(), clock + 1);
}
