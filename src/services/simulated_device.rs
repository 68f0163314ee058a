//! In-process stand-in for the motion/sensor controller
//!
//! Answers the same endpoints as the real controller so the backend can run
//! without hardware (`DEVICE_MODE=simulated`). Switches let callers make it
//! unreachable or refuse commands, queue scan readings, and decide when an
//! injection or homing run finishes.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::VecDeque;

use crate::models::device::{DeviceStatus, MoveCommand};
use crate::services::device_client::{DeviceClient, DeviceError, endpoints};

/// Millimetres travelled per motor step
const MM_PER_STEP: f64 = 0.01;

/// Most recent endpoint hits kept in the call log
pub const CALL_LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InjectionPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Halted,
}

#[derive(Debug, Default)]
struct SimulatorState {
    unreachable: bool,
    refuse_commands: bool,
    scanning: bool,
    queued_readings: Vec<f64>,
    injection: InjectionPhase,
    /// Status polls before a running injection completes by itself
    injection_polls: Option<u32>,
    injection_polls_seen: u32,
    homed: bool,
    homing_pending: bool,
    /// Status polls answered with "not homed" after a home command
    homing_polls: u32,
    homing_polls_remaining: u32,
    z_position: f64,
    y_position: f64,
    calls: VecDeque<String>,
}

#[derive(Default)]
pub struct SimulatedDevice {
    state: Mutex<SimulatorState>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the controller dropping off the network
    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unreachable = !reachable;
    }

    /// Answer commands (not queries) with `success: false`
    pub fn set_refuse_commands(&self, refuse: bool) {
        self.state.lock().refuse_commands = refuse;
    }

    /// Readings returned by the next `scanner/stop`
    pub fn queue_readings(&self, readings: Vec<f64>) {
        self.state.lock().queued_readings = readings;
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().scanning
    }

    /// Complete a running injection after `polls` status queries
    pub fn set_injection_polls(&self, polls: Option<u32>) {
        self.state.lock().injection_polls = polls;
    }

    pub fn finish_injection(&self) {
        let mut state = self.state.lock();
        if state.injection == InjectionPhase::Running {
            state.injection = InjectionPhase::Completed;
        }
    }

    /// Stop a running injection without completing it (e.g. e-stop)
    pub fn halt_injection(&self) {
        let mut state = self.state.lock();
        if state.injection == InjectionPhase::Running {
            state.injection = InjectionPhase::Halted;
        }
    }

    /// Number of status polls answered "not homed" after each home command
    pub fn set_homing_polls(&self, polls: u32) {
        self.state.lock().homing_polls = polls;
    }

    /// Endpoint hits, reachable or not, oldest first. Only the last
    /// [`CALL_LOG_CAPACITY`] are kept.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.iter().cloned().collect()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.as_str() == endpoint)
            .count()
    }
}

impl SimulatorState {
    fn injection_progress(&mut self) -> Value {
        if self.injection == InjectionPhase::Running
            && let Some(polls) = self.injection_polls
        {
            if self.injection_polls_seen >= polls {
                self.injection = InjectionPhase::Completed;
            } else {
                self.injection_polls_seen += 1;
            }
        }

        json!({
            "success": true,
            "isRunning": self.injection == InjectionPhase::Running,
            "isCompleted": self.injection == InjectionPhase::Completed,
        })
    }

    fn apply_move(&mut self, payload: Option<Value>) -> Value {
        let Some(cmd) = payload.and_then(|p| serde_json::from_value::<MoveCommand>(p).ok()) else {
            return json!({ "success": false, "error": "invalid move command" });
        };

        let delta = f64::from(cmd.steps) * f64::from(cmd.direction) * MM_PER_STEP;
        match cmd.axis.as_str() {
            "Z" => self.z_position += delta,
            "Y" => self.y_position += delta,
            other => {
                return json!({ "success": false, "error": format!("unknown axis {}", other) });
            }
        }
        json!({ "success": true })
    }

    fn movement_status(&mut self) -> Value {
        if self.homing_pending {
            if self.homing_polls_remaining == 0 {
                self.homing_pending = false;
                self.homed = true;
                self.z_position = 0.0;
                self.y_position = 0.0;
            } else {
                self.homing_polls_remaining -= 1;
            }
        }

        let status = DeviceStatus {
            z_position: self.z_position,
            y_position: self.y_position,
            is_homed: self.homed,
            is_moving: self.homing_pending,
            limit_switch1: self.homed,
            limit_switch2: self.homed,
            limit_switch3: false,
            timestamp: Utc::now().timestamp_millis(),
        };
        serde_json::to_value(status).unwrap_or_else(|_| json!({}))
    }
}

#[async_trait]
impl DeviceClient for SimulatedDevice {
    async fn send(&self, endpoint: &str, payload: Option<Value>) -> Result<String, DeviceError> {
        let mut state = self.state.lock();
        if state.calls.len() == CALL_LOG_CAPACITY {
            state.calls.pop_front();
        }
        state.calls.push_back(endpoint.to_string());

        if state.unreachable {
            return Err(DeviceError::communication(
                endpoint,
                "simulated device is unreachable",
            ));
        }

        let is_query = matches!(
            endpoint,
            endpoints::PING | endpoints::INJECTION_STATUS | endpoints::MOVEMENT_STATUS
        );
        if state.refuse_commands && !is_query {
            return Ok(json!({ "success": false, "error": "command refused" }).to_string());
        }

        let reply = match endpoint {
            endpoints::PING => json!({ "success": true }),
            endpoints::SCAN_START => {
                state.scanning = true;
                json!({ "success": true })
            }
            endpoints::SCAN_STOP => {
                if state.scanning {
                    state.scanning = false;
                    let readings = std::mem::take(&mut state.queued_readings);
                    json!({ "success": true, "readings": readings })
                } else {
                    json!({ "success": false, "error": "scanner is not running" })
                }
            }
            endpoints::INJECTION_START => {
                state.injection = InjectionPhase::Running;
                state.injection_polls_seen = 0;
                json!({ "success": true })
            }
            endpoints::INJECTION_STOP => {
                if state.injection == InjectionPhase::Running {
                    state.injection = InjectionPhase::Halted;
                }
                json!({ "success": true })
            }
            endpoints::INJECTION_STATUS => state.injection_progress(),
            endpoints::MOVEMENT_MOVE => state.apply_move(payload),
            endpoints::MOVEMENT_HOME => {
                state.homed = false;
                state.homing_pending = true;
                state.homing_polls_remaining = state.homing_polls;
                json!({ "success": true, "message": "homing started" })
            }
            endpoints::MOVEMENT_STATUS => state.movement_status(),
            other => {
                return Err(DeviceError::communication(
                    other,
                    "HTTP 404 Not Found",
                ));
            }
        };

        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::{DeviceAck, InjectionProgress, ScanStopReply};
    use crate::services::device_client::send_json;

    #[tokio::test]
    async fn test_scan_cycle_returns_queued_readings() {
        let device = SimulatedDevice::new();
        device.queue_readings(vec![1.0, 2.0]);

        let ack: DeviceAck = send_json(&device, endpoints::SCAN_START, None).await.unwrap();
        assert!(ack.accepted());
        assert!(device.is_scanning());

        let reply: ScanStopReply = send_json(&device, endpoints::SCAN_STOP, None).await.unwrap();
        assert!(reply.ack.accepted());
        assert_eq!(reply.readings, vec![1.0, 2.0]);

        let again: ScanStopReply = send_json(&device, endpoints::SCAN_STOP, None).await.unwrap();
        assert!(!again.ack.accepted());
    }

    #[tokio::test]
    async fn test_call_log_keeps_only_recent_hits() {
        let device = SimulatedDevice::new();
        for _ in 0..CALL_LOG_CAPACITY {
            device.send(endpoints::PING, None).await.unwrap();
        }
        device.send(endpoints::MOVEMENT_STATUS, None).await.unwrap();

        let calls = device.calls();
        assert_eq!(calls.len(), CALL_LOG_CAPACITY);
        assert_eq!(calls.last().map(String::as_str), Some(endpoints::MOVEMENT_STATUS));
        assert_eq!(device.call_count(endpoints::PING), CALL_LOG_CAPACITY - 1);
    }

    #[tokio::test]
    async fn test_unreachable_device_records_attempt() {
        let device = SimulatedDevice::new();
        device.set_reachable(false);

        assert!(device.send(endpoints::PING, None).await.is_err());
        assert!(!device.is_connected().await);
        assert_eq!(device.call_count(endpoints::PING), 2);
    }

    #[tokio::test]
    async fn test_injection_completes_after_configured_polls() {
        let device = SimulatedDevice::new();
        device.set_injection_polls(Some(1));
        device.send(endpoints::INJECTION_START, Some(json!({}))).await.unwrap();

        let first: InjectionProgress = send_json(&device, endpoints::INJECTION_STATUS, None)
            .await
            .unwrap();
        assert!(first.is_running);

        let second: InjectionProgress = send_json(&device, endpoints::INJECTION_STATUS, None)
            .await
            .unwrap();
        assert!(second.is_completed);
        assert!(!second.is_running);
    }

    #[tokio::test]
    async fn test_homing_reports_homed_after_polls() {
        let device = SimulatedDevice::new();
        device.set_homing_polls(1);
        device
            .send(endpoints::MOVEMENT_HOME, Some(json!({ "speed": 50 })))
            .await
            .unwrap();

        let first: DeviceStatus = send_json(&device, endpoints::MOVEMENT_STATUS, None)
            .await
            .unwrap();
        assert!(!first.is_homed);
        assert!(first.is_moving);

        let second: DeviceStatus = send_json(&device, endpoints::MOVEMENT_STATUS, None)
            .await
            .unwrap();
        assert!(second.is_homed);
    }

    #[tokio::test]
    async fn test_move_updates_position() {
        let device = SimulatedDevice::new();
        let cmd = json!({ "action": "move", "axis": "Z", "direction": -1, "speed": 50, "steps": 1000 });
        device.send(endpoints::MOVEMENT_MOVE, Some(cmd)).await.unwrap();

        let status: DeviceStatus = send_json(&device, endpoints::MOVEMENT_STATUS, None)
            .await
            .unwrap();
        assert!((status.z_position + 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_refused_commands_still_answer_queries() {
        let device = SimulatedDevice::new();
        device.set_refuse_commands(true);

        let ack: DeviceAck = send_json(&device, endpoints::SCAN_START, None).await.unwrap();
        assert!(!ack.accepted());
        assert!(device.is_connected().await);
    }
}
