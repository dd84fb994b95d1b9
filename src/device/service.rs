use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{BoxError, Service, ServiceBuilder};

use super::{DeviceHandle, RetryLayer, RetryPolicy};
use crate::common::{CaptureTrigger, CapturedUnit};
use crate::error::CaptureError;

/// Type-erased per-device capture path: timeout around retry around device.
pub type CaptureService = BoxCloneService<CaptureTrigger, Option<CapturedUnit>, BoxError>;

/// Exposes a device's acquire operation as a tower service.
#[derive(Clone, Debug)]
pub struct DeviceService {
    device: DeviceHandle,
}

impl DeviceService {
    pub fn new(device: DeviceHandle) -> Self {
        Self { device }
    }
}

impl Service<CaptureTrigger> for DeviceService {
    type Response = CapturedUnit;
    type Error = CaptureError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, trigger: CaptureTrigger) -> Self::Future {
        let device = self.device.clone();

        Box::pin(async move {
            let id = device.id().clone();
            // The acquire runs on its own task: dropping this future abandons
            // the wait but lets the device finish.
            tokio::spawn(async move { device.acquire(trigger).await })
                .await
                .map_err(|e| CaptureError::Aborted {
                    device: id,
                    reason: e.to_string(),
                })?
        })
    }
}

pub fn capture_service(
    device: DeviceHandle,
    policy: RetryPolicy,
    timeout: Duration,
) -> CaptureService {
    let stack = ServiceBuilder::new()
        .layer(TimeoutLayer::new(timeout))
        .layer(RetryLayer::new(policy))
        .service(DeviceService::new(device));

    BoxCloneService::new(stack)
}
