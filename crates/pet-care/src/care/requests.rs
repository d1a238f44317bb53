//! Adoption and care request records plus the status state machine.
//!
//! A request starts `pending`. The receiver decides it (`accepted` or
//! `rejected`); an accepted care request may later be `cancelled` by either
//! party. Rejected and cancelled requests never change again.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{PetId, PetSet, RequestId, RequestKind, SlotInput, UserId, WeeklySlot};
use super::error::CareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Cancelled)
    }

    /// Transition table. `None` means the action is not permitted from here.
    pub const fn next(self, action: RequestAction, kind: RequestKind) -> Option<RequestStatus> {
        match (self, action, kind) {
            (RequestStatus::Pending, RequestAction::Accept, _) => Some(RequestStatus::Accepted),
            (RequestStatus::Pending, RequestAction::Reject, _) => Some(RequestStatus::Rejected),
            (RequestStatus::Accepted, RequestAction::Cancel, RequestKind::Care) => {
                Some(RequestStatus::Cancelled)
            }
            (RequestStatus::Accepted, RequestAction::Cancel, RequestKind::Adopt)
            | (RequestStatus::Pending, RequestAction::Cancel, _)
            | (RequestStatus::Accepted, RequestAction::Accept | RequestAction::Reject, _)
            | (RequestStatus::Rejected | RequestStatus::Cancelled, _, _) => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestAction {
    Accept,
    Reject,
    Cancel,
}

impl RequestAction {
    const fn permits(self, party: Party) -> bool {
        match self {
            RequestAction::Accept | RequestAction::Reject => matches!(party, Party::Receiver),
            RequestAction::Cancel => matches!(party, Party::Sender | Party::Receiver),
        }
    }
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestAction::Accept => "accept",
            RequestAction::Reject => "reject",
            RequestAction::Cancel => "cancel",
        };
        f.write_str(label)
    }
}

/// Relationship of an actor to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Sender,
    Receiver,
    Outsider,
}

/// Persisted request row together with its pet attachment and agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareRequest {
    pub id: RequestId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub pets: PetSet,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: RequestStatus,
    /// Slots proposed by the sender, in proposal order. Empty for adoptions.
    pub agreement: Vec<WeeklySlot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CareRequest {
    pub fn party(&self, user: &UserId) -> Party {
        if &self.sender_id == user {
            Party::Sender
        } else if &self.receiver_id == user {
            Party::Receiver
        } else {
            Party::Outsider
        }
    }

    pub fn pet(&self) -> &PetId {
        self.pets.primary()
    }

    /// The user whose weekly calendar a care request books.
    ///
    /// Care requests are sent by the caregiver offering to look after the
    /// receiver's pet, so the sender is the caregiver. Adoptions book nobody.
    pub fn caregiver(&self) -> Option<&UserId> {
        match self.kind {
            RequestKind::Care => Some(&self.sender_id),
            RequestKind::Adopt => None,
        }
    }

    /// Resolve the status `actor` would move this request to with `action`.
    pub fn transition(
        &self,
        actor: &UserId,
        action: RequestAction,
    ) -> Result<RequestStatus, CareError> {
        if !action.permits(self.party(actor)) {
            return Err(CareError::Forbidden(match action {
                RequestAction::Accept | RequestAction::Reject => {
                    "only the receiver can decide a request"
                }
                RequestAction::Cancel => "only a party to the request can cancel it",
            }));
        }

        self.status
            .next(action, self.kind)
            .ok_or(CareError::InvalidTransition {
                from: self.status,
                action,
            })
    }
}

/// Client payload for `POST request(petId)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSubmission {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub slots: Vec<SlotInput>,
}

/// Which side of the inbox to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mailbox {
    Sent,
    #[default]
    Received,
}

/// Collapse repeated proposals while keeping the first occurrence in order.
pub(crate) fn dedupe_agreement(slots: Vec<WeeklySlot>) -> Vec<WeeklySlot> {
    let mut seen = std::collections::BTreeSet::new();
    slots.into_iter().filter(|slot| seen.insert(*slot)).collect()
}
