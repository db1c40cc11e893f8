//! Custom assertions and matchers for tests
//!
//! Provides expressive assertion helpers that improve test readability
//! and provide better error messages.

use crate::core_community::{Community, CommunityChanges, MemberKey};
use std::fmt::Debug;

/// Assert that a Result is Ok and return the value
pub fn assert_ok<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
}

/// Assert that a Result is Err and return the error
pub fn assert_err<T: Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
        Err(e) => e,
    }
}

/// Assert that a change set reports nothing
pub fn assert_no_changes(changes: &CommunityChanges) {
    if !changes.is_empty() {
        panic!("Expected no changes, got {:?}", changes);
    }
}

/// Assert that a change set reports `chat_id` as modified and return its entry
pub fn assert_chat_modified<'a>(
    changes: &'a CommunityChanges,
    chat_id: &str,
) -> &'a crate::core_community::ChatChanges {
    match changes.chats_modified.get(chat_id) {
        Some(entry) => entry,
        None => panic!(
            "Expected chat {} to be modified, modified chats: {:?}",
            chat_id,
            changes.chats_modified.keys().collect::<Vec<_>>()
        ),
    }
}

/// Assert that two communities hold the same description
pub fn assert_converged(a: &Community, b: &Community) {
    let (left, right) = (a.description(), b.description());
    if left != right {
        panic!(
            "Expected communities to converge, clocks {} and {}",
            left.clock, right.clock
        );
    }
}

/// Assert that `member` belongs to the community but not to `chat_id`
pub fn assert_member_outside_chat(community: &Community, member: &MemberKey, chat_id: &str) {
    assert!(
        community.has_member(member),
        "Expected {} to be a community member",
        member
    );
    assert!(
        !community.is_member_in_chat(member, chat_id),
        "Expected {} not to be a member of chat {}",
        member,
        chat_id
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_ok() {
        let result: Result<i32, String> = Ok(42);
        assert_eq!(assert_ok(result), 42);
    }

    #[test]
    #[should_panic(expected = "Expected Ok")]
    fn test_assert_ok_panics() {
        let result: Result<i32, String> = Err("error".to_string());
        assert_ok(result);
    }

    #[test]
    fn test_assert_err() {
        let result: Result<i32, String> = Err("error".to_string());
        assert_eq!(assert_err(result), "error");
    }

    #[test]
    fn test_assert_no_changes() {
        assert_no_changes(&CommunityChanges::empty());
    }

    #[test]
    #[should_panic(expected = "Expected chat general to be modified")]
    fn test_assert_chat_modified_panics() {
        assert_chat_modified(&CommunityChanges::empty(), "general");
    }
}
