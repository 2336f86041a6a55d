//! Snapshot store for the authenticated user's message feed.
//!
//! The service has no stable reconciliation key for messages, so there is
//! no incremental merge: every fetch replaces the snapshot wholesale.
//! Records are kept in server response order; the store never re-sorts by
//! timestamp because client clocks may be skewed relative to arrival
//! order.

use chrono::{DateTime, Utc};
use shared::{domain::UserId, protocol::MessageWire};
use tracing::debug;

/// A validated message record. Immutable once ingested.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub sender_username: String,
    pub receiver_username: String,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    /// Validate one wire record into the strict internal shape.
    ///
    /// A record missing either username (absent or blank after trimming)
    /// is unusable for conversation grouping and is dropped. Missing
    /// numeric ids default to 0 and a missing timestamp to the epoch;
    /// neither participates in grouping, so a permissive default is
    /// preferable to discarding an otherwise readable message.
    pub fn from_wire(wire: MessageWire) -> Option<Self> {
        let sender_username = non_blank(wire.sender_username)?;
        let receiver_username = non_blank(wire.receiver_username)?;
        Some(Self {
            sender_username,
            receiver_username,
            sender_id: UserId(wire.sender.unwrap_or(0)),
            receiver_id: UserId(wire.receiver.unwrap_or(0)),
            text: wire.text.unwrap_or_default(),
            timestamp: wire.timestamp.unwrap_or_default(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    let value = value?;
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Holds the current feed snapshot together with the fetch-sequence
/// watermark used to discard responses from superseded fetches.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    records: Vec<MessageRecord>,
    last_applied_fetch: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a freshly fetched batch.
    ///
    /// `fetch_seq` is the tag assigned when the fetch was started. A
    /// batch whose tag is not newer than the last applied one belongs to
    /// a fetch that was superseded while in flight; it is discarded and
    /// the current snapshot stays untouched. Returns whether the batch
    /// was applied.
    ///
    /// Records failing shape validation are silently dropped (best-effort
    /// feed semantics); the drop count is logged at debug level.
    pub fn ingest(&mut self, fetch_seq: u64, batch: Vec<MessageWire>) -> bool {
        if fetch_seq <= self.last_applied_fetch {
            debug!(
                fetch_seq,
                last_applied = self.last_applied_fetch,
                "discarding stale fetch response"
            );
            return false;
        }

        let total = batch.len();
        let records: Vec<MessageRecord> = batch
            .into_iter()
            .filter_map(MessageRecord::from_wire)
            .collect();
        if records.len() < total {
            debug!(
                dropped = total - records.len(),
                kept = records.len(),
                "dropped malformed message records at ingest"
            );
        }

        self.records = records;
        self.last_applied_fetch = fetch_seq;
        true
    }

    /// Current snapshot, in the order the server returned it.
    pub fn all(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop the snapshot (logout teardown). The fetch watermark is kept
    /// so a response still in flight from the old session cannot
    /// repopulate the store.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(
        sender: &str,
        receiver: &str,
        sender_id: i64,
        receiver_id: i64,
        text: &str,
    ) -> MessageWire {
        MessageWire {
            id: None,
            sender: Some(sender_id),
            receiver: Some(receiver_id),
            sender_username: Some(sender.to_string()),
            receiver_username: Some(receiver.to_string()),
            text: Some(text.to_string()),
            timestamp: None,
        }
    }

    #[test]
    fn ingest_replaces_snapshot_wholesale() {
        let mut store = MessageStore::new();
        assert!(store.ingest(1, vec![wire("alice", "bob", 1, 2, "first")]));
        assert!(store.ingest(2, vec![wire("carol", "bob", 3, 2, "second")]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].sender_username, "carol");
    }

    #[test]
    fn malformed_records_are_dropped_silently() {
        let mut store = MessageStore::new();
        let mut missing_receiver = wire("alice", "bob", 1, 2, "broken");
        missing_receiver.receiver_username = None;
        let mut blank_receiver = wire("alice", "  ", 1, 2, "also broken");
        blank_receiver.receiver_username = Some("  ".to_string());

        assert!(store.ingest(
            1,
            vec![
                wire("alice", "bob", 1, 2, "ok"),
                missing_receiver,
                blank_receiver,
                wire("bob", "alice", 2, 1, "also ok"),
            ],
        ));
        assert_eq!(store.len(), 2);
        assert_eq!(store.all()[0].text, "ok");
        assert_eq!(store.all()[1].text, "also ok");
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut store = MessageStore::new();
        assert!(store.ingest(2, vec![wire("alice", "bob", 1, 2, "fresh")]));
        // A slow fetch started earlier finally completes.
        assert!(!store.ingest(1, vec![wire("alice", "bob", 1, 2, "stale")]));
        assert_eq!(store.all()[0].text, "fresh");
        // Same tag twice is also stale.
        assert!(!store.ingest(2, vec![]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn arrival_order_is_preserved() {
        let mut store = MessageStore::new();
        store.ingest(
            1,
            vec![
                wire("alice", "bob", 1, 2, "one"),
                wire("bob", "alice", 2, 1, "two"),
                wire("alice", "bob", 1, 2, "three"),
            ],
        );
        let texts: Vec<&str> = store.all().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[test]
    fn clear_keeps_the_fetch_watermark() {
        let mut store = MessageStore::new();
        store.ingest(3, vec![wire("alice", "bob", 1, 2, "hello")]);
        store.clear();
        assert!(store.is_empty());
        assert!(!store.ingest(3, vec![wire("alice", "bob", 1, 2, "late echo")]));
        assert!(store.is_empty());
    }

    #[test]
    fn missing_ids_and_timestamp_default_instead_of_dropping() {
        let record = MessageRecord::from_wire(MessageWire {
            sender_username: Some("alice".into()),
            receiver_username: Some("bob".into()),
            text: Some("hello".into()),
            ..MessageWire::default()
        })
        .expect("usable record");
        assert_eq!(record.sender_id, UserId(0));
        assert_eq!(record.receiver_id, UserId(0));
    }
}
