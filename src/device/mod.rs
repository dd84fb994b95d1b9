pub mod retry;
pub mod service;
pub mod simulated;

pub use retry::{Retry, RetryLayer, RetryPolicy};
pub use service::{capture_service, CaptureService, DeviceService};
pub use simulated::{CameraInfo, CaptureProfile, SimulatedCamera};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::common::{CaptureTrigger, CapturedUnit, DeviceId};
use crate::error::CaptureError;

/// One capture source.
///
/// `acquire` may take arbitrary time and may fail. It exposes no cancellation
/// hook; callers that give up simply stop waiting.
#[async_trait]
pub trait Device: Send {
    fn id(&self) -> &DeviceId;

    async fn acquire(&mut self, trigger: CaptureTrigger) -> Result<CapturedUnit, CaptureError>;
}

/// Shared handle to a device. The lock guarantees a device is driven by at
/// most one task at a time.
#[derive(Clone)]
pub struct DeviceHandle {
    id: DeviceId,
    device: Arc<Mutex<Box<dyn Device>>>,
}

impl DeviceHandle {
    pub fn new<D>(device: D) -> Self
    where
        D: Device + 'static,
    {
        Self {
            id: device.id().clone(),
            device: Arc::new(Mutex::new(Box::new(device))),
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub async fn acquire(&self, trigger: CaptureTrigger) -> Result<CapturedUnit, CaptureError> {
        let mut device = self.device.lock().await;
        device.acquire(trigger).await
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle").field("id", &self.id).finish()
    }
}
