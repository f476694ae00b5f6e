//! Chat entity, membership rules and repository trait.
//!
//! Maps to the `chats` table in the database schema. Every membership
//! mutation goes through a method on [`Chat`] so the group size bounds are
//! checked in one place; services only persist the result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A group never drops below this many members.
pub const MIN_GROUP_MEMBERS: usize = 3;

/// A group never grows beyond this many members.
pub const MAX_GROUP_MEMBERS: usize = 100;

/// Invited members required to create a group (the creator makes the third).
pub const MIN_INVITED_MEMBERS: usize = MIN_GROUP_MEMBERS - 1;

/// Reasons a membership change is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("Group chat must have at least {MIN_GROUP_MEMBERS} members")]
    TooFewMembers,

    #[error("Not a group chat")]
    NotGroup,

    #[error("You are not the creator of this group")]
    NotCreator,

    #[error("Cannot remove yourself")]
    CannotRemoveSelf,

    #[error("User is not a member of this chat")]
    NotMember,

    #[error("Group must have at least {MIN_GROUP_MEMBERS} members")]
    MinimumMembers,

    #[error("Group members limit reached")]
    MembershipLimit,
}

/// Represents a direct or group conversation.
///
/// Maps to the `chats` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NOT NULL
/// - group_chat: BOOLEAN NOT NULL DEFAULT FALSE
/// - creator_id: BIGINT NULL REFERENCES users(id) (groups only)
/// - members: BIGINT[] NOT NULL (ordered)
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Group name, or the requesting user's name for direct chats
    pub name: String,

    /// Whether this is a group chat
    pub group_chat: bool,

    /// Group creator (None for direct chats)
    pub creator_id: Option<i64>,

    /// Member user IDs in join order
    pub members: Vec<i64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Drop duplicates while keeping first-seen order.
fn dedup_ordered(ids: &[i64]) -> Vec<i64> {
    let mut out: Vec<i64> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

impl Chat {
    /// Build a new group chat.
    ///
    /// The creator and duplicate IDs are removed from `invited`; at least
    /// [`MIN_INVITED_MEMBERS`] distinct others must remain. The creator is
    /// appended as the last member.
    pub fn new_group(
        id: i64,
        name: impl Into<String>,
        creator_id: i64,
        invited: &[i64],
    ) -> Result<Self, MembershipError> {
        let mut members: Vec<i64> = dedup_ordered(invited)
            .into_iter()
            .filter(|m| *m != creator_id)
            .collect();

        if members.len() < MIN_INVITED_MEMBERS {
            return Err(MembershipError::TooFewMembers);
        }
        if members.len() + 1 > MAX_GROUP_MEMBERS {
            return Err(MembershipError::MembershipLimit);
        }
        members.push(creator_id);

        let now = Utc::now();
        Ok(Self {
            id,
            name: name.into(),
            group_chat: true,
            creator_id: Some(creator_id),
            members,
            created_at: now,
            updated_at: now,
        })
    }

    /// Build a one-to-one chat between two users.
    pub fn new_direct(id: i64, name: impl Into<String>, first: i64, second: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            group_chat: false,
            creator_id: None,
            members: vec![first, second],
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether `user_id` belongs to this chat.
    pub fn is_member(&self, user_id: i64) -> bool {
        self.members.contains(&user_id)
    }

    /// Check whether `user_id` created this group.
    pub fn is_creator(&self, user_id: i64) -> bool {
        self.creator_id == Some(user_id)
    }

    /// The first member that is not `user_id` (the peer of a direct chat).
    pub fn other_member(&self, user_id: i64) -> Option<i64> {
        self.members.iter().copied().find(|m| *m != user_id)
    }

    /// Members other than `user_id`, in order.
    pub fn members_except(&self, user_id: i64) -> Vec<i64> {
        self.members.iter().copied().filter(|m| *m != user_id).collect()
    }

    /// Fail unless `user_id` is a member.
    pub fn ensure_member(&self, user_id: i64) -> Result<(), MembershipError> {
        if self.is_member(user_id) {
            Ok(())
        } else {
            Err(MembershipError::NotMember)
        }
    }

    /// Fail unless this is a group and `actor` created it.
    pub fn ensure_can_manage(&self, actor: i64) -> Result<(), MembershipError> {
        if !self.group_chat {
            return Err(MembershipError::NotGroup);
        }
        if !self.is_creator(actor) {
            return Err(MembershipError::NotCreator);
        }
        Ok(())
    }

    /// Add members on behalf of `actor`.
    ///
    /// Already-present and duplicate IDs are skipped. Returns the IDs that
    /// were actually added; on error the chat is left untouched.
    pub fn add_members(&mut self, actor: i64, new_members: &[i64]) -> Result<Vec<i64>, MembershipError> {
        self.ensure_can_manage(actor)?;

        let added: Vec<i64> = dedup_ordered(new_members)
            .into_iter()
            .filter(|m| !self.is_member(*m))
            .collect();

        if self.members.len() + added.len() > MAX_GROUP_MEMBERS {
            return Err(MembershipError::MembershipLimit);
        }

        self.members.extend_from_slice(&added);
        self.touch();
        Ok(added)
    }

    /// Remove `target` on behalf of `actor`.
    ///
    /// Returns the member list as it was before the removal.
    pub fn remove_member(&mut self, actor: i64, target: i64) -> Result<Vec<i64>, MembershipError> {
        if actor == target {
            return Err(MembershipError::CannotRemoveSelf);
        }
        self.ensure_can_manage(actor)?;
        self.ensure_member(target)?;
        if self.members.len() <= MIN_GROUP_MEMBERS {
            return Err(MembershipError::MinimumMembers);
        }

        let before = self.members.clone();
        self.members.retain(|m| *m != target);
        self.touch();
        Ok(before)
    }

    /// Remove `user_id` from the group at their own request.
    ///
    /// If the leaver created the group, a replacement creator is drawn
    /// uniformly from the remaining members and returned.
    pub fn leave<R: Rng + ?Sized>(&mut self, user_id: i64, rng: &mut R) -> Result<Option<i64>, MembershipError> {
        if !self.group_chat {
            return Err(MembershipError::NotGroup);
        }
        self.ensure_member(user_id)?;

        let remaining = self.members_except(user_id);
        if remaining.len() < MIN_GROUP_MEMBERS {
            return Err(MembershipError::MinimumMembers);
        }

        let new_creator = if self.is_creator(user_id) {
            let pick = remaining[rng.random_range(0..remaining.len())];
            self.creator_id = Some(pick);
            Some(pick)
        } else {
            None
        };

        self.members = remaining;
        self.touch();
        Ok(new_creator)
    }

    /// Rename the group on behalf of `actor`.
    pub fn rename(&mut self, actor: i64, name: impl Into<String>) -> Result<(), MembershipError> {
        self.ensure_can_manage(actor)?;
        self.name = name.into();
        self.touch();
        Ok(())
    }

    /// Groups may only be deleted by their creator; direct chats by either member.
    pub fn ensure_can_delete(&self, actor: i64) -> Result<(), MembershipError> {
        if self.group_chat && !self.is_creator(actor) {
            return Err(MembershipError::NotCreator);
        }
        self.ensure_member(actor)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Optional predicates for counting chats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatFilter {
    /// Restrict to group (`Some(true)`) or direct (`Some(false)`) chats
    pub group_chat: Option<bool>,

    /// Restrict to chats containing this user
    pub member: Option<i64>,
}

/// Repository trait for Chat data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find a chat by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError>;

    /// Insert a new chat.
    async fn create(&self, chat: &Chat) -> Result<Chat, AppError>;

    /// Persist name, creator and members of an existing chat.
    async fn update(&self, chat: &Chat) -> Result<Chat, AppError>;

    /// Delete a chat by ID.
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Every chat containing `user_id`.
    async fn find_by_member(&self, user_id: i64) -> Result<Vec<Chat>, AppError>;

    /// Direct chats containing `user_id`.
    async fn find_direct_by_member(&self, user_id: i64) -> Result<Vec<Chat>, AppError>;

    /// Groups created by `user_id`.
    async fn find_by_creator(&self, user_id: i64) -> Result<Vec<Chat>, AppError>;

    /// All chats, oldest first.
    async fn list_all(&self) -> Result<Vec<Chat>, AppError>;

    /// Count chats matching `filter`.
    async fn count(&self, filter: ChatFilter) -> Result<i64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CREATOR: i64 = 1;

    fn group_of(size: usize) -> Chat {
        let invited: Vec<i64> = (2..=size as i64).collect();
        Chat::new_group(100, "Rustaceans", CREATOR, &invited).unwrap()
    }

    // ==========================================================================
    // Creation Tests
    // ==========================================================================

    #[test]
    fn test_new_group_appends_creator() {
        let chat = Chat::new_group(100, "Team", 3, &[1, 2]).unwrap();

        assert_eq!(chat.members, vec![1, 2, 3]);
        assert!(chat.group_chat);
        assert_eq!(chat.creator_id, Some(3));
    }

    #[test]
    fn test_new_group_dedupes_creator_and_duplicates() {
        let err = Chat::new_group(100, "Team", 1, &[1, 2, 2]).unwrap_err();
        assert_eq!(err, MembershipError::TooFewMembers);
    }

    #[test]
    fn test_new_group_rejects_oversized() {
        let invited: Vec<i64> = (2..=101).collect();
        let err = Chat::new_group(100, "Team", CREATOR, &invited).unwrap_err();
        assert_eq!(err, MembershipError::MembershipLimit);
    }

    #[test]
    fn test_new_direct() {
        let chat = Chat::new_direct(7, "Ada", 1, 2);

        assert!(!chat.group_chat);
        assert_eq!(chat.creator_id, None);
        assert_eq!(chat.other_member(1), Some(2));
        assert_eq!(chat.other_member(2), Some(1));
    }

    // ==========================================================================
    // Add Member Tests
    // ==========================================================================

    #[test]
    fn test_add_members_filters_existing() {
        let mut chat = group_of(3);

        let added = chat.add_members(CREATOR, &[2, 4, 4, 5]).unwrap();

        assert_eq!(added, vec![4, 5]);
        assert_eq!(chat.members.len(), 5);
    }

    #[test]
    fn test_add_members_over_limit_leaves_chat_unchanged() {
        let mut chat = group_of(99);
        let before = chat.members.clone();

        let err = chat.add_members(CREATOR, &[500, 501]).unwrap_err();

        assert_eq!(err, MembershipError::MembershipLimit);
        assert_eq!(chat.members, before);
    }

    #[test]
    fn test_add_members_up_to_limit() {
        let mut chat = group_of(99);
        assert!(chat.add_members(CREATOR, &[500]).is_ok());
        assert_eq!(chat.members.len(), MAX_GROUP_MEMBERS);
    }

    #[test]
    fn test_add_members_requires_creator() {
        let mut chat = group_of(3);
        assert_eq!(chat.add_members(2, &[9]).unwrap_err(), MembershipError::NotCreator);
    }

    #[test]
    fn test_add_members_requires_group() {
        let mut chat = Chat::new_direct(7, "Ada", CREATOR, 2);
        assert_eq!(chat.add_members(CREATOR, &[9]).unwrap_err(), MembershipError::NotGroup);
    }

    // ==========================================================================
    // Remove Member Tests
    // ==========================================================================

    #[test]
    fn test_remove_member_from_minimum_group_fails() {
        let mut chat = group_of(3);
        assert_eq!(chat.remove_member(CREATOR, 2).unwrap_err(), MembershipError::MinimumMembers);
        assert_eq!(chat.members.len(), 3);
    }

    #[test]
    fn test_remove_member_returns_previous_members() {
        let mut chat = group_of(4);

        let before = chat.remove_member(CREATOR, 2).unwrap();

        assert_eq!(before, vec![2, 3, 4, CREATOR]);
        assert_eq!(chat.members, vec![3, 4, CREATOR]);
    }

    #[test]
    fn test_remove_self_rejected() {
        let mut chat = group_of(5);
        assert_eq!(chat.remove_member(CREATOR, CREATOR).unwrap_err(), MembershipError::CannotRemoveSelf);
    }

    #[test]
    fn test_remove_non_member_rejected() {
        let mut chat = group_of(5);
        assert_eq!(chat.remove_member(CREATOR, 42).unwrap_err(), MembershipError::NotMember);
    }

    #[test]
    fn test_remove_requires_creator() {
        let mut chat = group_of(5);
        assert_eq!(chat.remove_member(2, 3).unwrap_err(), MembershipError::NotCreator);
    }

    // ==========================================================================
    // Leave Tests
    // ==========================================================================

    #[test]
    fn test_creator_leaving_reassigns_creator() {
        let mut chat = group_of(4);
        let mut rng = StdRng::seed_from_u64(7);

        let new_creator = chat.leave(CREATOR, &mut rng).unwrap().unwrap();

        assert!([2, 3, 4].contains(&new_creator));
        assert_eq!(chat.creator_id, Some(new_creator));
        assert_eq!(chat.members, vec![2, 3, 4]);
    }

    #[test]
    fn test_member_leaving_keeps_creator() {
        let mut chat = group_of(4);
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(chat.leave(3, &mut rng).unwrap(), None);
        assert_eq!(chat.creator_id, Some(CREATOR));
        assert!(!chat.is_member(3));
    }

    #[test]
    fn test_leave_below_minimum_fails() {
        let mut chat = group_of(3);
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(chat.leave(2, &mut rng).unwrap_err(), MembershipError::MinimumMembers);
        assert_eq!(chat.members.len(), 3);
    }

    #[test]
    fn test_leave_direct_chat_rejected() {
        let mut chat = Chat::new_direct(7, "Ada", 1, 2);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(chat.leave(1, &mut rng).unwrap_err(), MembershipError::NotGroup);
    }

    #[test]
    fn test_creator_reassignment_covers_all_remaining_members() {
        let mut seen = std::collections::HashSet::new();
        for seed in 0..200 {
            let mut chat = group_of(4);
            let mut rng = StdRng::seed_from_u64(seed);
            seen.insert(chat.leave(CREATOR, &mut rng).unwrap().unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    // ==========================================================================
    // Rename / Delete Tests
    // ==========================================================================

    #[test]
    fn test_rename_requires_creator() {
        let mut chat = group_of(3);
        assert_eq!(chat.rename(2, "New").unwrap_err(), MembershipError::NotCreator);
        chat.rename(CREATOR, "New").unwrap();
        assert_eq!(chat.name, "New");
    }

    #[test]
    fn test_delete_permissions() {
        let group = group_of(3);
        assert_eq!(group.ensure_can_delete(2).unwrap_err(), MembershipError::NotCreator);
        assert!(group.ensure_can_delete(CREATOR).is_ok());

        let direct = Chat::new_direct(7, "Ada", 1, 2);
        assert!(direct.ensure_can_delete(2).is_ok());
        assert_eq!(direct.ensure_can_delete(9).unwrap_err(), MembershipError::NotMember);
    }
}
