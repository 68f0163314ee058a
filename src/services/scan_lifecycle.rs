//! Scan lifecycle: in_progress → success | failed
//!
//! Readings are not streamed; the device hands them over in its reply to
//! `scanner/stop`.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::device::{DeviceAck, ScanStopReply};
use crate::models::operation::{Operation, Transition};
use crate::models::scan::{Scan, ScanOperation, ScanStatus};
use crate::services::device_client::{DeviceClient, endpoints, send_json};
use crate::services::lifecycle::{
    LifecycleError, LifecycleSettings, StopConfirmationPolicy, find_owned, recent_history,
};
use crate::services::operation_store::Repository;

#[derive(Clone)]
pub struct ScanLifecycle {
    store: Arc<dyn Repository<Scan>>,
    device: Arc<dyn DeviceClient>,
    settings: LifecycleSettings,
}

impl ScanLifecycle {
    pub fn new(
        store: Arc<dyn Repository<Scan>>,
        device: Arc<dyn DeviceClient>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            device,
            settings,
        }
    }

    /// Record a new scan and tell the device to begin.
    ///
    /// The scan is returned whatever the device says; a refusal or an
    /// unreachable device leaves it `failed`.
    pub async fn start(&self, user_id: &str) -> Result<ScanOperation, LifecycleError> {
        let mut op = self
            .store
            .add(Operation::new(
                user_id,
                ScanStatus::InProgress,
                Scan::default(),
                Utc::now(),
            ))
            .await?;

        match send_json::<DeviceAck>(self.device.as_ref(), endpoints::SCAN_START, None).await {
            Ok(ack) if ack.accepted() => {
                info!(scan_id = op.id, user_id = %user_id, "Scan started");
                return Ok(op);
            }
            Ok(ack) => {
                let reason = ack.refusal_reason(endpoints::SCAN_START);
                warn!(scan_id = op.id, reason = %reason, "Device refused to start scan");
                op.fail(reason, Utc::now())?;
            }
            Err(e) => {
                error!(scan_id = op.id, error = %e, "Failed to start scan");
                op.fail(e.to_string(), Utc::now())?;
            }
        }

        self.store.update(&op).await?;
        Ok(op)
    }

    /// Stop a running scan and collect its readings
    pub async fn stop(
        &self,
        user_id: &str,
        scan_id: i32,
    ) -> Result<Transition<ScanOperation>, LifecycleError> {
        let Some(mut op) = find_owned(self.store.as_ref(), user_id, scan_id).await? else {
            return Ok(Transition::NotFound);
        };

        if !matches!(op.status, ScanStatus::InProgress | ScanStatus::Unconfirmed) {
            return Ok(Transition::InvalidState {
                status: op.status.to_string(),
            });
        }

        let now = Utc::now();
        match send_json::<ScanStopReply>(self.device.as_ref(), endpoints::SCAN_STOP, None).await {
            Ok(reply) if reply.ack.accepted() => {
                op.details.readings = reply.readings;
                op.error_message = None;
                op.transition(ScanStatus::Success, now)?;
                info!(
                    scan_id,
                    readings = op.details.readings.len(),
                    "Scan stopped with readings"
                );
            }
            Ok(reply) => {
                let reason = reply.ack.refusal_reason(endpoints::SCAN_STOP);
                warn!(scan_id, reason = %reason, "Device reported scan failure");
                op.fail(reason, now)?;
            }
            Err(e) => match self.settings.stop_policy {
                StopConfirmationPolicy::FailOpen => {
                    warn!(scan_id, error = %e, "Scan stop not confirmed, marking failed");
                    op.fail(e.to_string(), now)?;
                }
                StopConfirmationPolicy::Hold => {
                    warn!(scan_id, error = %e, "Scan stop not confirmed, holding as unconfirmed");
                    op.transition(ScanStatus::Unconfirmed, now)?;
                    op.error_message = Some(e.to_string());
                }
            },
        }

        self.store.update(&op).await?;
        Ok(Transition::Applied(op))
    }

    /// Most recent scans of `user_id`, newest first
    pub async fn history(&self, user_id: &str) -> Result<Vec<ScanOperation>, LifecycleError> {
        Ok(recent_history(self.store.as_ref(), user_id, self.settings.history_limit).await?)
    }
}
