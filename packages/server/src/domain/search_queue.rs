//! Search Queue
//!
//! パートナーを探しているユーザーの集合。挿入順を保持し、
//! マッチングは先頭から順に候補を走査します。

use std::collections::{HashSet, VecDeque};

use super::value_object::UserId;

/// Ordered set of users currently seeking a match
#[derive(Debug, Default)]
pub struct SearchQueue {
    order: VecDeque<UserId>,
    members: HashSet<UserId>,
}

impl SearchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `user_id`; returns `false` if it was already queued
    pub fn enqueue(&mut self, user_id: UserId) -> bool {
        if !self.members.insert(user_id.clone()) {
            return false;
        }
        self.order.push_back(user_id);
        true
    }

    /// Remove `user_id`; returns `false` if it was not queued
    pub fn dequeue(&mut self, user_id: &UserId) -> bool {
        if !self.members.remove(user_id) {
            return false;
        }
        self.order.retain(|queued| queued != user_id);
        true
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    /// Iterate in queue order
    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
