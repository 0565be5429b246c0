//! # Menu History Module
//!
//! Per-user back-stack of visited screens. State is process-local and is lost on
//! restart, after which the next "back" falls through to the home screen.
//!
//! Every user has their own lock. A request cycle holds it from the moment it
//! decides where to navigate until the history is committed, so two rapid taps by
//! the same user are applied one after the other while other users proceed freely.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::screen::ScreenId;

/// Maximum number of entries kept per user
pub const HISTORY_DEPTH: usize = 10;

pub type UserId = i64;

/// Ordered screens for one user, most recent last
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStack {
    entries: VecDeque<ScreenId>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a screen unless it is already on top, evicting the oldest past the depth limit
    pub fn push(&mut self, screen: ScreenId) {
        if self.entries.back() == Some(&screen) {
            return;
        }
        self.entries.push_back(screen);
        while self.entries.len() > HISTORY_DEPTH {
            self.entries.pop_front();
        }
    }

    /// Drop the current screen and return the one below it.
    ///
    /// With fewer than two entries nothing changes and `None` is returned.
    pub fn pop_to_previous(&mut self) -> Option<ScreenId> {
        if self.entries.len() < 2 {
            return None;
        }
        self.entries.pop_back();
        self.entries.back().cloned()
    }

    /// Screen that `pop_to_previous` would return, without mutating
    pub fn previous(&self) -> Option<&ScreenId> {
        let len = self.entries.len();
        if len < 2 {
            None
        } else {
            self.entries.get(len - 2)
        }
    }

    /// Discard the entry below the current screen, keeping the current one.
    ///
    /// Used when that entry can no longer be shown. Further entries equal to the
    /// current screen are discarded too, so the top never repeats.
    pub fn discard_previous(&mut self) -> Option<ScreenId> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        let discarded = self.entries.remove(len - 2);
        while self.entries.len() >= 2 && self.previous() == self.current() {
            let len = self.entries.len();
            self.entries.remove(len - 2);
        }
        discarded
    }

    pub fn current(&self) -> Option<&ScreenId> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ScreenId> {
        self.entries.iter()
    }
}

/// Exclusive access to one user's stack for the duration of a request cycle
pub type HistoryGuard = OwnedMutexGuard<HistoryStack>;

/// Map of user id to back-stack, with one lock per user.
///
/// Entries are never evicted: every user who has navigated keeps a stack for the
/// life of the process. Each stack is capped at [`HISTORY_DEPTH`], the map is not.
#[derive(Debug, Default, Clone)]
pub struct MenuHistory {
    users: Arc<Mutex<HashMap<UserId, Arc<Mutex<HistoryStack>>>>>,
}

impl MenuHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a user's stack, creating it on first use.
    ///
    /// The outer map lock is released before waiting on the user lock, so a slow
    /// cycle for one user never blocks another user.
    pub async fn lock(&self, user_id: UserId) -> HistoryGuard {
        let stack = {
            let mut users = self.users.lock().await;
            Arc::clone(users.entry(user_id).or_default())
        };
        stack.lock_owned().await
    }

    pub async fn push(&self, user_id: UserId, screen: ScreenId) {
        self.lock(user_id).await.push(screen);
    }

    pub async fn pop_to_previous(&self, user_id: UserId) -> Option<ScreenId> {
        self.lock(user_id).await.pop_to_previous()
    }

    pub async fn current(&self, user_id: UserId) -> Option<ScreenId> {
        self.lock(user_id).await.current().cloned()
    }

    /// Snapshot of a user's stack, oldest first
    pub async fn snapshot(&self, user_id: UserId) -> Vec<ScreenId> {
        self.lock(user_id).await.entries().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_push_skips_duplicate_top() {
        let mut stack = HistoryStack::new();
        stack.push(ScreenId::Main);
        stack.push(ScreenId::Main);
        assert_eq!(stack.len(), 1);

        stack.push(ScreenId::Contacts);
        stack.push(ScreenId::Main);
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_pop_returns_new_top() {
        let mut stack = HistoryStack::new();
        stack.push(ScreenId::Main);
        stack.push(ScreenId::Top);

        assert_eq!(stack.previous(), Some(&ScreenId::Main));
        assert_eq!(stack.pop_to_previous(), Some(ScreenId::Main));
        assert_eq!(stack.current(), Some(&ScreenId::Main));
        assert_eq!(stack.len(), 1);

        // a single entry is never popped
        assert_eq!(stack.pop_to_previous(), None);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_depth_limit_drops_oldest() {
        let mut stack = HistoryStack::new();
        for i in 0..11 {
            stack.push(ScreenId::Contact(format!("service {i}")));
        }
        assert_eq!(stack.len(), HISTORY_DEPTH);
        assert_eq!(
            stack.entries().next(),
            Some(&ScreenId::Contact("service 1".to_string()))
        );
        assert_eq!(
            stack.current(),
            Some(&ScreenId::Contact("service 10".to_string()))
        );
    }

    #[test]
    fn test_discard_previous_keeps_current() {
        let mut stack = HistoryStack::new();
        stack.push(ScreenId::Contacts);
        stack.push(ScreenId::Contact("Gaz".to_string()));
        stack.push(ScreenId::Top);

        assert_eq!(
            stack.discard_previous(),
            Some(ScreenId::Contact("Gaz".to_string()))
        );
        assert_eq!(
            stack.entries().cloned().collect::<Vec<_>>(),
            vec![ScreenId::Contacts, ScreenId::Top]
        );
    }

    #[test]
    fn test_discard_previous_never_leaves_repeated_top() {
        let mut stack = HistoryStack::new();
        stack.push(ScreenId::Main);
        stack.push(ScreenId::Top);
        stack.push(ScreenId::Main);

        stack.discard_previous();
        assert_eq!(stack.entries().cloned().collect::<Vec<_>>(), vec![ScreenId::Main]);
        assert_eq!(stack.discard_previous(), None);
    }

    #[tokio::test]
    async fn test_keyed_pop_on_fresh_user() {
        let history = MenuHistory::new();
        assert_eq!(history.pop_to_previous(7).await, None);
        assert_eq!(history.current(7).await, None);
    }

    #[tokio::test]
    async fn test_keyed_push_and_pop() {
        let history = MenuHistory::new();
        history.push(7, ScreenId::Main).await;
        history.push(7, ScreenId::Main).await;
        assert_eq!(history.snapshot(7).await, vec![ScreenId::Main]);

        history.push(7, ScreenId::Contacts).await;
        assert_eq!(history.pop_to_previous(7).await, Some(ScreenId::Main));
        assert_eq!(history.snapshot(7).await, vec![ScreenId::Main]);
        assert_eq!(history.current(7).await, Some(ScreenId::Main));
    }

    #[tokio::test]
    async fn test_users_have_independent_stacks() {
        let history = MenuHistory::new();
        history.push(1, ScreenId::Main).await;
        history.push(1, ScreenId::Top).await;
        history.push(2, ScreenId::About).await;

        assert_eq!(history.pop_to_previous(2).await, None);
        assert_eq!(history.pop_to_previous(1).await, Some(ScreenId::Main));
        assert_eq!(history.snapshot(2).await, vec![ScreenId::About]);
    }

    #[tokio::test]
    async fn test_lock_blocks_same_user_only() {
        let history = MenuHistory::new();
        let guard = history.lock(1).await;

        let other = timeout(Duration::from_millis(200), history.lock(2)).await;
        assert!(other.is_ok(), "another user must not wait");
        drop(other);

        let same = timeout(Duration::from_millis(50), history.lock(1)).await;
        assert!(same.is_err(), "same user must wait for the held guard");

        drop(guard);
        let same = timeout(Duration::from_millis(200), history.lock(1)).await;
        assert!(same.is_ok());
    }
}
