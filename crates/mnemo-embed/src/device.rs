use candle_core::Device;
use tracing::info;

/// Probe for an accelerator once, at construction time, and return the
/// device handle the model is pinned to. There is no process-wide device
/// flag; callers that want a different device construct a new backend.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            info!("embedding device: metal");
            return dev;
        }
    }
    info!("embedding device: cpu");
    Device::Cpu
}
