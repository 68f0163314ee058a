//! Injection lifecycle: active → completed | stopped | failed
//!
//! Every start attempt leaves a row behind, including the ones the device
//! refused or never answered. Completion is discovered lazily by polling.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::device::{DeviceAck, InjectionProgress, InjectionStartCommand};
use crate::models::injection::{Injection, InjectionOperation, InjectionStatus};
use crate::models::operation::{Operation, Transition};
use crate::services::device_client::{
    DeviceClient, DeviceError, encode_command, endpoints, send_json,
};
use crate::services::lifecycle::{
    LifecycleError, LifecycleSettings, StopConfirmationPolicy, find_owned, recent_history,
};
use crate::services::operation_store::Repository;

#[derive(Clone)]
pub struct InjectionLifecycle {
    store: Arc<dyn Repository<Injection>>,
    device: Arc<dyn DeviceClient>,
    settings: LifecycleSettings,
}

impl InjectionLifecycle {
    pub fn new(
        store: Arc<dyn Repository<Injection>>,
        device: Arc<dyn DeviceClient>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            device,
            settings,
        }
    }

    /// Send the run parameters to the device and record the attempt.
    ///
    /// A refusal yields a `failed` row. An unreachable device also writes a
    /// `failed` row, then raises with that row's id.
    pub async fn start(
        &self,
        user_id: &str,
        params: Injection,
    ) -> Result<InjectionOperation, LifecycleError> {
        params.validate().map_err(LifecycleError::Validation)?;

        let command = encode_command(
            endpoints::INJECTION_START,
            &InjectionStartCommand::from(&params),
        )?;
        let outcome =
            send_json::<DeviceAck>(self.device.as_ref(), endpoints::INJECTION_START, Some(command))
                .await;

        let now = Utc::now();
        let mut op = Operation::new(user_id, InjectionStatus::Active, params, now);

        match outcome {
            Ok(ack) if ack.accepted() => {
                let op = self.store.add(op).await?;
                info!(operation_id = op.id, user_id = %user_id, "Injection started");
                Ok(op)
            }
            Ok(ack) => {
                let reason = ack.refusal_reason(endpoints::INJECTION_START);
                op.fail(reason.clone(), now)?;
                let op = self.store.add(op).await?;
                warn!(operation_id = op.id, reason = %reason, "Device refused injection");
                Ok(op)
            }
            Err(e) => {
                op.fail(e.to_string(), now)?;
                let op = self.store.add(op).await?;
                error!(operation_id = op.id, error = %e, "Failed to start injection, recorded as failed");
                Err(LifecycleError::device(Some(op.id), e))
            }
        }
    }

    /// Stop an active injection.
    ///
    /// Unknown, foreign and already-finished operations come back as
    /// [`Transition::NotFound`] / [`Transition::InvalidState`]. Device trouble
    /// never raises here; what happens to the row is decided by the stop
    /// confirmation policy.
    pub async fn stop(
        &self,
        user_id: &str,
        operation_id: i32,
    ) -> Result<Transition<InjectionOperation>, LifecycleError> {
        let Some(mut op) = find_owned(self.store.as_ref(), user_id, operation_id).await? else {
            return Ok(Transition::NotFound);
        };

        if !matches!(
            op.status,
            InjectionStatus::Active | InjectionStatus::Unconfirmed
        ) {
            return Ok(Transition::InvalidState {
                status: op.status.to_string(),
            });
        }

        let unconfirmed_reason =
            match send_json::<DeviceAck>(self.device.as_ref(), endpoints::INJECTION_STOP, None)
                .await
            {
                Ok(ack) if ack.accepted() => None,
                Ok(ack) => Some(ack.refusal_reason(endpoints::INJECTION_STOP)),
                Err(e) => Some(e.to_string()),
            };

        let now = Utc::now();
        match (unconfirmed_reason, self.settings.stop_policy) {
            (None, _) => {
                op.error_message = None;
                op.transition(InjectionStatus::Stopped, now)?;
                info!(operation_id, "Injection stopped");
            }
            (Some(reason), StopConfirmationPolicy::FailOpen) => {
                warn!(operation_id, reason = %reason, "Injection stop not confirmed by device, marking stopped");
                op.transition(InjectionStatus::Stopped, now)?;
                op.error_message = Some(reason);
            }
            (Some(reason), StopConfirmationPolicy::Hold) => {
                warn!(operation_id, reason = %reason, "Injection stop not confirmed by device, holding as unconfirmed");
                op.transition(InjectionStatus::Unconfirmed, now)?;
                op.error_message = Some(reason);
            }
        }

        self.store.update(&op).await?;
        Ok(Transition::Applied(op))
    }

    /// Mark an active injection completed without asking the device
    pub async fn complete(
        &self,
        user_id: &str,
        operation_id: i32,
    ) -> Result<Transition<InjectionOperation>, LifecycleError> {
        let Some(mut op) = find_owned(self.store.as_ref(), user_id, operation_id).await? else {
            return Ok(Transition::NotFound);
        };

        if op.status != InjectionStatus::Active {
            return Ok(Transition::InvalidState {
                status: op.status.to_string(),
            });
        }

        op.transition(InjectionStatus::Completed, Utc::now())?;
        self.store.update(&op).await?;
        info!(operation_id, "Injection marked completed");

        Ok(Transition::Applied(op))
    }

    /// Ask the device how the current run is doing. Pure read.
    pub async fn query_progress(&self) -> Result<InjectionProgress, DeviceError> {
        send_json(self.device.as_ref(), endpoints::INJECTION_STATUS, None).await
    }

    /// Apply a device progress report to an open injection and persist it if
    /// the status changed. Finished rows and refused reports are left as is.
    pub async fn reconcile(
        &self,
        mut op: InjectionOperation,
        progress: &InjectionProgress,
    ) -> Result<InjectionOperation, LifecycleError> {
        if op.is_terminal() || !progress.ack.accepted() {
            return Ok(op);
        }

        let next = if progress.is_completed {
            InjectionStatus::Completed
        } else if !progress.is_running {
            InjectionStatus::Stopped
        } else {
            return Ok(op);
        };

        op.transition(next, Utc::now())?;
        self.store.update(&op).await?;
        info!(operation_id = op.id, status = %next, "Injection reconciled with device");

        Ok(op)
    }

    /// Current row of an owned injection, reconciled with the device when it
    /// is still open. An unreachable device leaves the row untouched.
    pub async fn poll_completion(
        &self,
        user_id: &str,
        operation_id: i32,
    ) -> Result<Option<InjectionOperation>, LifecycleError> {
        let Some(op) = find_owned(self.store.as_ref(), user_id, operation_id).await? else {
            return Ok(None);
        };

        if op.is_terminal() {
            return Ok(Some(op));
        }

        match self.query_progress().await {
            Ok(progress) => Ok(Some(self.reconcile(op, &progress).await?)),
            Err(e) => {
                warn!(operation_id, error = %e, "Device unreachable while polling, leaving injection unchanged");
                Ok(Some(op))
            }
        }
    }

    /// Most recent injections of `user_id`, newest first
    pub async fn history(
        &self,
        user_id: &str,
    ) -> Result<Vec<InjectionOperation>, LifecycleError> {
        Ok(recent_history(self.store.as_ref(), user_id, self.settings.history_limit).await?)
    }
}
