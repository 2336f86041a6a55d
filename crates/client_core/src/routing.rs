//! Outgoing-message target resolution.
//!
//! Two UI sources can nominate the current counterparty: a profile opened
//! explicitly (search result or dossier view) and a chat selected in the
//! sidebar. The selection context collapses them into a single tagged
//! state up front, so routing never has to reason about two independently
//! nullable fields or a "both stale" combination.

use shared::{domain::UserId, protocol::ProfileRecord};
use thiserror::Error;

use crate::conversations::Partner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No profile is open and no chat is selected. The send must be
    /// blocked and reported; the router never guesses a recipient.
    #[error("message target not specified")]
    NoTarget,
}

/// The one counterparty a newly composed message would go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    /// An explicitly opened profile. Opening a profile is a stronger and
    /// more recent intent signal than a lingering chat selection, so this
    /// variant wins when both sources are populated.
    Profile(UserId),
    /// The partner selected in the chat sidebar.
    ChatPartner(UserId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionContext {
    target: Option<SendTarget>,
}

impl SelectionContext {
    /// Collapse the two UI sources into the tagged routing state,
    /// applying the profile-over-chat precedence rule.
    pub fn from_sources(
        viewed_profile: Option<&ProfileRecord>,
        selected_partner: Option<&Partner>,
    ) -> Self {
        let target = match (viewed_profile, selected_partner) {
            (Some(profile), _) => Some(SendTarget::Profile(profile.user)),
            (None, Some(partner)) => Some(SendTarget::ChatPartner(partner.identity)),
            (None, None) => None,
        };
        Self { target }
    }

    pub fn target(&self) -> Option<SendTarget> {
        self.target
    }

    /// The identity a new message must be addressed to, or `NoTarget`.
    pub fn resolve_target(&self) -> Result<UserId, RouteError> {
        match self.target {
            Some(SendTarget::Profile(id)) | Some(SendTarget::ChatPartner(id)) => Ok(id),
            None => Err(RouteError::NoTarget),
        }
    }
}
