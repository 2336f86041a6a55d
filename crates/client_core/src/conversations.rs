//! Derived conversation views over the message snapshot: the partner
//! directory shown in the sidebar and the per-partner thread.

use shared::domain::UserId;

use crate::{
    identity::{normalize, same_identity},
    store::{MessageRecord, MessageStore},
};

/// A distinct conversation counterparty, derived from the feed.
///
/// `display_name` keeps the casing of the counterparty's first
/// appearance; `identity` is their numeric id as reported by that record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partner {
    pub display_name: String,
    pub identity: UserId,
}

/// Derive the distinct partner set for `self_username`.
///
/// One entry per distinct normalized counterparty name, in order of first
/// appearance in the snapshot (stable for a given input sequence, not
/// alphabetical). Records that do not involve `self_username` at all are
/// ignored, as are self-addressed records. Empty when the store is empty
/// or the own username is blank.
pub fn build_partners(store: &MessageStore, self_username: &str) -> Vec<Partner> {
    let me = normalize(self_username);
    if me.is_empty() {
        return Vec::new();
    }

    let mut seen: Vec<String> = Vec::new();
    let mut partners: Vec<Partner> = Vec::new();
    for record in store.all() {
        let (name, identity) = if same_identity(&record.sender_username, self_username) {
            (&record.receiver_username, record.receiver_id)
        } else if same_identity(&record.receiver_username, self_username) {
            (&record.sender_username, record.sender_id)
        } else {
            // Not this account's conversation; the feed should not
            // contain such records, but the engine tolerates them.
            continue;
        };

        let key = normalize(name);
        if key == me || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        partners.push(Partner {
            display_name: name.trim().to_string(),
            identity,
        });
    }
    partners
}

/// Filter the snapshot down to the thread with one counterparty.
///
/// Matches every record naming the partner on either side, so the caller
/// can label each line by comparing the sender against the authenticated
/// user separately. Store order is preserved. Empty when the partner name
/// is blank.
pub fn select_thread<'a>(store: &'a MessageStore, active_partner_name: &str) -> Vec<&'a MessageRecord> {
    if normalize(active_partner_name).is_empty() {
        return Vec::new();
    }
    store
        .all()
        .iter()
        .filter(|record| {
            same_identity(&record.sender_username, active_partner_name)
                || same_identity(&record.receiver_username, active_partner_name)
        })
        .collect()
}
