//! Generic operation record shared by scans, injections and movements
//!
//! An operation is parameterised by its kind. The kind carries the
//! kind-specific parameters (or result payload) and names the status enum the
//! operation moves through, so every kind only has the states it can reach.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Status enum of one operation kind
pub trait LifecycleStatus:
    Copy + Eq + fmt::Debug + fmt::Display + FromStr<Err = String> + Send + Sync + 'static
{
    /// Terminal states never transition again and always carry an end time
    fn is_terminal(&self) -> bool;

    /// The failure state of this kind
    fn failed() -> Self;
}

/// Marker for the kind-specific part of an operation
pub trait OperationKind: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    type Status: LifecycleStatus;

    /// Human readable kind name used in logs and errors
    const LABEL: &'static str;
}

/// A durable record of one device-backed action
#[derive(Debug, Clone, PartialEq)]
pub struct Operation<K: OperationKind> {
    /// Store-assigned identifier, 0 until the record has been added
    pub id: i32,
    /// Owning user, as handed over by the authentication boundary
    pub user_id: String,
    pub status: K::Status,
    pub details: K,
    /// Device fault or refusal that led to the current status
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returned when a transition out of a terminal state is attempted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} operation {id} is already {status}")]
pub struct TerminalState {
    pub kind: &'static str,
    pub id: i32,
    pub status: String,
}

impl<K: OperationKind> Operation<K> {
    /// Build an unsaved operation. The end time is set when the initial status
    /// is already terminal.
    pub fn new(user_id: impl Into<String>, status: K::Status, details: K, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id: user_id.into(),
            status,
            details,
            error_message: None,
            started_at: now,
            ended_at: status.is_terminal().then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, keeping `ended_at` in step with terminality.
    pub fn transition(&mut self, next: K::Status, now: DateTime<Utc>) -> Result<(), TerminalState> {
        if self.status.is_terminal() {
            return Err(TerminalState {
                kind: K::LABEL,
                id: self.id,
                status: self.status.to_string(),
            });
        }

        self.status = next;
        self.ended_at = next.is_terminal().then_some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Transition to the kind's failure state and record why.
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), TerminalState> {
        self.transition(K::Status::failed(), now)?;
        self.error_message = Some(message.into());
        Ok(())
    }
}

/// Outcome of a state-changing request against an existing operation.
///
/// Unknown/not-owned ids and wrong-state requests are ordinary results, not
/// errors, so callers can tell "your request was invalid" from "the system
/// had a fault".
#[derive(Debug, Clone, PartialEq)]
pub enum Transition<T> {
    Applied(T),
    NotFound,
    InvalidState { status: String },
}

impl<T> Transition<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Transition::Applied(value) => Some(value),
            _ => None,
        }
    }
}
