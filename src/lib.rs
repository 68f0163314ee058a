// src/lib.rs

use std::sync::Arc;

use services::device_client::DeviceClient;
use services::inference_client::{InferenceApi, RetryPolicy};
use services::injection_lifecycle::InjectionLifecycle;
use services::lifecycle::LifecycleSettings;
use services::movement_lifecycle::MovementLifecycle;
use services::operation_store::Stores;
use services::scan_lifecycle::ScanLifecycle;

#[derive(Clone)]
pub struct AppState {
    pub scans: ScanLifecycle,
    pub injections: InjectionLifecycle,
    pub movements: MovementLifecycle,
    pub device: Arc<dyn DeviceClient>,
    pub inference: Arc<dyn InferenceApi>,
    pub inference_retry: RetryPolicy,
}

impl AppState {
    pub fn new(
        stores: Stores,
        device: Arc<dyn DeviceClient>,
        inference: Arc<dyn InferenceApi>,
        settings: LifecycleSettings,
        inference_retry: RetryPolicy,
    ) -> Self {
        Self {
            scans: ScanLifecycle::new(stores.scans, device.clone(), settings),
            injections: InjectionLifecycle::new(stores.injections, device.clone(), settings),
            movements: MovementLifecycle::new(stores.movements, device.clone(), settings),
            device,
            inference,
            inference_retry,
        }
    }
}

pub mod entities {
    pub mod prelude;
    pub mod scan_operations;
    pub mod injection_operations;
    pub mod movement_commands;
}

pub mod services {
    pub mod device_client;
    pub mod simulated_device;
    pub mod inference_client;
    pub mod operation_store;
    pub mod memory_store;
    pub mod sea_store;
    pub mod lifecycle;
    pub mod scan_lifecycle;
    pub mod injection_lifecycle;
    pub mod movement_lifecycle;
}

pub mod handlers {
    pub mod auth;
    pub mod error;
    pub mod scanner;
    pub mod injection;
    pub mod movement;
    pub mod device;
    pub mod inference;
}

pub mod config;
pub mod models;
pub mod routes;
