//! Session context and the fetch/send orchestration around the store.

use shared::protocol::ProfileRecord;
use tracing::{debug, warn};

use crate::{
    api::ApiClient,
    conversations::{build_partners, Partner},
    error::ClientError,
    routing::SelectionContext,
    store::MessageStore,
};

/// Credential and identity for one authenticated session.
///
/// Created by a successful login or register and passed explicitly to
/// every protected call; dropped on logout. There is no ambient global
/// holding the token.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    username: String,
}

impl Session {
    pub fn new(token: String, username: String) -> Self {
        Self { token, username }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Owns the store and partner directory for one session and drives the
/// pull → ingest → rebuild cycle.
///
/// Every refresh is tagged with the next value of a monotone counter;
/// the store discards batches whose tag has been superseded, so a slow
/// fetch completing late cannot overwrite fresher data ("last started
/// fetch wins").
pub struct SessionController {
    api: ApiClient,
    session: Session,
    store: MessageStore,
    partners: Vec<Partner>,
    fetch_seq: u64,
}

impl SessionController {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self {
            api,
            session,
            store: MessageStore::new(),
            partners: Vec::new(),
            fetch_seq: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn self_username(&self) -> &str {
        self.session.username()
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Partner directory derived from the current snapshot, in first-
    /// appearance order.
    pub fn partners(&self) -> &[Partner] {
        &self.partners
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn fetch_profile(&self) -> Result<ProfileRecord, ClientError> {
        self.api.fetch_me(&self.session).await
    }

    pub async fn search_profiles(&self, query: &str) -> Result<Vec<ProfileRecord>, ClientError> {
        self.api.search_profiles(&self.session, query).await
    }

    /// Pull the feed and replace the snapshot. On transport or service
    /// failure the previous snapshot and partner directory stay in place.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.fetch_seq += 1;
        let seq = self.fetch_seq;
        let batch = match self.api.fetch_messages(&self.session).await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(fetch_seq = seq, error = %err, "feed refresh failed, keeping prior snapshot");
                return Err(err);
            }
        };
        if self.store.ingest(seq, batch) {
            self.partners = build_partners(&self.store, self.session.username());
            debug!(
                fetch_seq = seq,
                messages = self.store.len(),
                partners = self.partners.len(),
                "feed refreshed"
            );
        }
        Ok(())
    }

    /// Resolve the target from the selection context, dispatch, then
    /// re-pull the feed. A routing failure blocks the send before any
    /// network traffic; callers keep the composed text so the user can
    /// retry.
    ///
    /// Once the dispatch succeeds the send is a success, even when the
    /// follow-up re-pull fails: the message is already on the server, and
    /// reporting the re-pull error as a send failure would invite a
    /// duplicate retry. The echoed record then lands on the next refresh.
    pub async fn send(
        &mut self,
        selection: &SelectionContext,
        text: &str,
    ) -> Result<(), ClientError> {
        let receiver = selection.resolve_target()?;
        self.api.send_message(&self.session, receiver, text).await?;
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "post-send feed re-pull failed, snapshot is behind by one send");
        }
        Ok(())
    }
}
