//! Shared pieces of the scan, injection and movement lifecycle managers

use std::fmt;
use std::str::FromStr;

use crate::models::operation::{Operation, OperationKind, TerminalState};
use crate::services::device_client::DeviceError;
use crate::services::operation_store::{ListSpec, Repository, StoreError};

/// Default number of entries returned by the history operations
pub const DEFAULT_HISTORY_LIMIT: u64 = 10;

/// What a stop does when the device never acknowledges it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopConfirmationPolicy {
    /// Move the operation to its terminal state anyway
    #[default]
    FailOpen,
    /// Park the operation in `unconfirmed` until a later stop or poll settles it
    Hold,
}

impl fmt::Display for StopConfirmationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopConfirmationPolicy::FailOpen => write!(f, "fail_open"),
            StopConfirmationPolicy::Hold => write!(f, "hold"),
        }
    }
}

impl FromStr for StopConfirmationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_open" => Ok(StopConfirmationPolicy::FailOpen),
            "hold" => Ok(StopConfirmationPolicy::Hold),
            _ => Err(format!("Unknown stop confirmation policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub history_limit: u64,
    pub stop_policy: StopConfirmationPolicy,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            stop_policy: StopConfirmationPolicy::default(),
        }
    }
}

/// Faults raised by the lifecycle managers.
///
/// Not-found and wrong-state requests are not errors; they come back as
/// [`Transition`](crate::models::operation::Transition) values.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Rejected before any device call
    #[error("{0}")]
    Validation(String),
    /// The device could not be reached or replied with garbage. `operation_id`
    /// names the failed audit row when one was written.
    #[error("{source}")]
    Device {
        operation_id: Option<i32>,
        source: DeviceError,
    },
    /// Another request moved the operation to a terminal state first
    #[error(transparent)]
    Conflict(#[from] TerminalState),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn device(operation_id: Option<i32>, source: DeviceError) -> Self {
        LifecycleError::Device {
            operation_id,
            source,
        }
    }
}

impl From<DeviceError> for LifecycleError {
    fn from(source: DeviceError) -> Self {
        LifecycleError::device(None, source)
    }
}

/// Load an operation only if `user_id` owns it
pub(crate) async fn find_owned<K: OperationKind>(
    store: &dyn Repository<K>,
    user_id: &str,
    id: i32,
) -> Result<Option<Operation<K>>, StoreError> {
    Ok(store
        .get_by_id(id)
        .await?
        .filter(|op| op.is_owned_by(user_id)))
}

/// Most recent operations of `user_id`, newest first
pub(crate) async fn recent_history<K: OperationKind>(
    store: &dyn Repository<K>,
    user_id: &str,
    limit: u64,
) -> Result<Vec<Operation<K>>, StoreError> {
    store.list(&ListSpec::recent_for(user_id, limit)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "fail_open".parse::<StopConfirmationPolicy>().unwrap(),
            StopConfirmationPolicy::FailOpen
        );
        assert_eq!(
            "Fail-Open".parse::<StopConfirmationPolicy>().unwrap(),
            StopConfirmationPolicy::FailOpen
        );
        assert_eq!(
            " hold ".parse::<StopConfirmationPolicy>().unwrap(),
            StopConfirmationPolicy::Hold
        );
        assert!("maybe".parse::<StopConfirmationPolicy>().is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = LifecycleSettings::default();
        assert_eq!(settings.history_limit, 10);
        assert_eq!(settings.stop_policy, StopConfirmationPolicy::FailOpen);
    }

    #[test]
    fn test_device_error_keeps_operation_id() {
        let err = LifecycleError::device(
            Some(4),
            DeviceError::communication("injection/start", "timed out"),
        );
        assert!(matches!(err, LifecycleError::Device { operation_id: Some(4), .. }));
        assert!(err.to_string().contains("injection/start"));
    }
}
