use std::fmt;

use serde::Serialize;
use tracing::info;

/// Compute device a model is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    /// CUDA device by ordinal.
    Cuda(usize),
}

impl Device {
    pub fn is_accelerated(&self) -> bool {
        matches!(self, Self::Cuda(_))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(id) => write!(f, "cuda:{id}"),
        }
    }
}

/// Reports whether an accelerated device exists on this host.
pub trait DeviceProbe {
    fn accelerator_available(&self) -> bool;
}

/// Probe for hosts without an accelerator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccelerator;

impl DeviceProbe for NoAccelerator {
    fn accelerator_available(&self) -> bool {
        false
    }
}

/// Picks `Cuda(0)` when the GPU is preferred and the probe finds one,
/// otherwise `Cpu`. Never fails.
///
/// The probe is not consulted when the GPU is not preferred.
pub fn select_device(prefer_gpu: bool, probe: &dyn DeviceProbe) -> Device {
    if !prefer_gpu {
        return Device::Cpu;
    }
    if probe.accelerator_available() {
        Device::Cuda(0)
    } else {
        info!("hubert: gpu preferred but no accelerator available, using cpu");
        Device::Cpu
    }
}
