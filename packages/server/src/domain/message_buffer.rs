//! Ephemeral Message Buffer
//!
//! Random room ごとの未永続化メッセージのキュー。
//! クライアントの再送による重複を時間窓で排除します。
//! Room ごとの件数には上限があり、超えた分は古いものから捨てます。

use std::collections::{HashMap, VecDeque};

use super::{
    entity::ChatMessage,
    value_object::{RoomId, Timestamp, UserId},
};

/// Result of [`MessageBuffer::append`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Appended in arrival order
    Appended,
    /// Dropped as a re-delivery of a buffered message
    Duplicate,
    /// The room has no open buffer
    NoBuffer,
}

/// Per-room buffer of not-yet-persisted messages
#[derive(Debug)]
pub struct MessageBuffer {
    dedup_window_millis: i64,
    max_per_room: usize,
    buffers: HashMap<RoomId, VecDeque<ChatMessage>>,
}

impl MessageBuffer {
    pub fn new(dedup_window_millis: i64, max_per_room: usize) -> Self {
        Self {
            dedup_window_millis,
            max_per_room: max_per_room.max(1),
            buffers: HashMap::new(),
        }
    }

    /// Open an empty buffer for `room_id` (existing messages are kept)
    pub fn open(&mut self, room_id: RoomId) {
        self.buffers.entry(room_id).or_default();
    }

    /// Append `message` unless a buffered message within the dedup window
    /// has the same sender and identical text.
    ///
    /// A full buffer drops its oldest message to make room.
    pub fn append(&mut self, room_id: &RoomId, message: ChatMessage) -> AppendOutcome {
        let Some(messages) = self.buffers.get_mut(room_id) else {
            return AppendOutcome::NoBuffer;
        };

        let window = self.dedup_window_millis;
        let duplicate = messages
            .iter()
            .filter(|buffered| buffered.timestamp.distance_millis(&message.timestamp) < window)
            .any(|buffered| buffered.is_same_delivery(&message));
        if duplicate {
            return AppendOutcome::Duplicate;
        }

        if messages.len() >= self.max_per_room {
            messages.pop_front();
            tracing::debug!("Message buffer of '{}' is full, dropped the oldest message", room_id);
        }
        messages.push_back(message);
        AppendOutcome::Appended
    }

    /// Buffered messages in insertion order, without removing them
    pub fn drain(&self, room_id: &RoomId) -> Vec<ChatMessage> {
        self.buffers
            .get(room_id)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove the buffer of `room_id`; returns `false` if none was open
    pub fn clear(&mut self, room_id: &RoomId) -> bool {
        self.buffers.remove(room_id).is_some()
    }

    /// Mark the message `sender_id` sent at `timestamp` as seen
    pub fn mark_seen(&mut self, room_id: &RoomId, sender_id: &UserId, timestamp: Timestamp) -> bool {
        self.buffers
            .get_mut(room_id)
            .and_then(|messages| {
                messages
                    .iter_mut()
                    .find(|m| &m.sender_id == sender_id && m.timestamp == timestamp)
            })
            .map(|message| message.seen = true)
            .is_some()
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.buffers.contains_key(room_id)
    }

    pub fn room_ids(&self) -> impl Iterator<Item = &RoomId> {
        self.buffers.keys()
    }

    /// Total number of buffered messages across all rooms
    pub fn message_count(&self) -> usize {
        self.buffers.values().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{MessageText, RoomKind};

    const WINDOW: i64 = 1000;
    const MAX_PER_ROOM: usize = 1000;

    fn user(hex: char) -> UserId {
        UserId::new(hex.to_string().repeat(24)).unwrap()
    }

    fn room_id() -> RoomId {
        RoomId::derive(RoomKind::Random, &user('a'), &user('b'))
    }

    fn message(sender: char, text: &str, timestamp: i64) -> ChatMessage {
        ChatMessage::new(
            user(sender),
            MessageText::new(text.to_string()).unwrap(),
            Timestamp::new(timestamp),
        )
    }

    fn open_buffer() -> MessageBuffer {
        let mut buffer = MessageBuffer::new(WINDOW, MAX_PER_ROOM);
        buffer.open(room_id());
        buffer
    }

    #[test]
    fn test_duplicate_within_window_is_dropped() {
        // テスト項目: 時間窓内の同一送信者・同一本文のメッセージは 1 件だけ保持される
        // given (前提条件):
        let mut buffer = open_buffer();
        buffer.append(&room_id(), message('a', "hello", 10_000));

        // when (操作):
        let outcome = buffer.append(&room_id(), message('a', "hello", 10_400));

        // then (期待する結果):
        assert_eq!(outcome, AppendOutcome::Duplicate);
        assert_eq!(buffer.drain(&room_id()).len(), 1);
    }

    #[test]
    fn test_duplicate_after_window_is_kept() {
        // テスト項目: 時間窓を過ぎた同一メッセージは別メッセージとして保持される
        // given (前提条件):
        let mut buffer = open_buffer();
        buffer.append(&room_id(), message('a', "hello", 10_000));

        // when (操作):
        let outcome = buffer.append(&room_id(), message('a', "hello", 10_000 + WINDOW));

        // then (期待する結果):
        assert_eq!(outcome, AppendOutcome::Appended);
        assert_eq!(buffer.drain(&room_id()).len(), 2);
    }

    #[test]
    fn test_same_text_from_other_sender_is_kept() {
        // テスト項目: 本文が同じでも送信者が異なれば重複とみなさない
        // given (前提条件):
        let mut buffer = open_buffer();
        buffer.append(&room_id(), message('a', "lol", 10_000));

        // when (操作):
        let outcome = buffer.append(&room_id(), message('b', "lol", 10_001));

        // then (期待する結果):
        assert_eq!(outcome, AppendOutcome::Appended);
    }

    #[test]
    fn test_drain_preserves_order_without_removing() {
        // テスト項目: drain は挿入順でメッセージを返し、バッファからは削除しない
        // given (前提条件):
        let mut buffer = open_buffer();
        buffer.append(&room_id(), message('a', "first", 1));
        buffer.append(&room_id(), message('b', "second", 2));
        buffer.append(&room_id(), message('a', "third", 3));

        // when (操作):
        let drained = buffer.drain(&room_id());

        // then (期待する結果):
        let texts: Vec<&str> = drained.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(buffer.message_count(), 3);
    }

    #[test]
    fn test_full_buffer_drops_oldest() {
        // テスト項目: 上限に達した Room では最も古いメッセージが捨てられ、件数は上限を超えない
        // given (前提条件):
        let mut buffer = MessageBuffer::new(WINDOW, 3);
        buffer.open(room_id());
        for (i, text) in ["one", "two", "three"].into_iter().enumerate() {
            buffer.append(&room_id(), message('a', text, i as i64));
        }

        // when (操作):
        let outcome = buffer.append(&room_id(), message('b', "four", 3));

        // then (期待する結果):
        assert_eq!(outcome, AppendOutcome::Appended);
        let texts: Vec<String> = buffer
            .drain(&room_id())
            .iter()
            .map(|m| m.text.as_str().to_string())
            .collect();
        assert_eq!(texts, vec!["two", "three", "four"]);
        assert_eq!(buffer.message_count(), 3);
    }

    #[test]
    fn test_append_without_buffer() {
        // テスト項目: バッファが開かれていない Room への追加は NoBuffer を返す
        // given (前提条件):
        let mut buffer = MessageBuffer::new(WINDOW, MAX_PER_ROOM);

        // when (操作):
        let outcome = buffer.append(&room_id(), message('a', "hello", 1));

        // then (期待する結果):
        assert_eq!(outcome, AppendOutcome::NoBuffer);
        assert!(buffer.drain(&room_id()).is_empty());
    }

    #[test]
    fn test_clear_removes_buffer() {
        // テスト項目: clear 後はバッファが削除され、2 回目の clear は false
        // given (前提条件):
        let mut buffer = open_buffer();
        buffer.append(&room_id(), message('a', "hello", 1));

        // when (操作):
        let first = buffer.clear(&room_id());
        let second = buffer.clear(&room_id());

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(!buffer.contains(&room_id()));
    }

    #[test]
    fn test_mark_seen() {
        // テスト項目: 送信者とタイムスタンプが一致するメッセージが既読になる
        // given (前提条件):
        let mut buffer = open_buffer();
        buffer.append(&room_id(), message('a', "hello", 42));

        // when (操作):
        let wrong_sender = buffer.mark_seen(&room_id(), &user('b'), Timestamp::new(42));
        let marked = buffer.mark_seen(&room_id(), &user('a'), Timestamp::new(42));

        // then (期待する結果):
        assert!(!wrong_sender);
        assert!(marked);
        assert!(buffer.drain(&room_id())[0].seen);
    }
}
