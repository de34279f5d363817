//! Platform providers of virtual-memory statistics.
//!
//! macOS reads the Mach host statistics, Linux reads `/proc/vmstat`. Each
//! provider resolves its platform handles once, in `open`, and keeps them for
//! its whole lifetime.

mod vmstat;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod mach;

pub use vmstat::parse_vmstat;

#[cfg(target_os = "linux")]
pub use linux::ProcVmstat;
#[cfg(target_os = "macos")]
pub use mach::MachHost;

use sketchysensor_core::SensorError;

/// Statistics provider for the platform this binary was built for.
#[cfg(target_os = "linux")]
pub type HostMemory = ProcVmstat;

/// Statistics provider for the platform this binary was built for.
#[cfg(target_os = "macos")]
pub type HostMemory = MachHost;

/// Statistics provider for the platform this binary was built for.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub type HostMemory = UnsupportedHost;

/// Open the statistics provider of the running host.
///
/// # Errors
///
/// Returns [`SensorError::Unavailable`] when the platform has no provider.
pub fn host_provider() -> Result<HostMemory, SensorError> {
    HostMemory::open()
}

/// Placeholder provider for platforms without memory statistics support.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
#[derive(Debug)]
pub struct UnsupportedHost(());

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
impl UnsupportedHost {
    fn unsupported() -> SensorError {
        SensorError::unavailable(format!(
            "memory statistics are not supported on {}",
            std::env::consts::OS
        ))
    }

    /// Always fails: there is nothing to open.
    pub fn open() -> Result<Self, SensorError> {
        Err(Self::unsupported())
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
impl crate::memory::VmStatsProvider for UnsupportedHost {
    fn page_size(&self) -> Result<u64, SensorError> {
        Err(Self::unsupported())
    }

    fn total_memory(&self) -> Result<u64, SensorError> {
        Err(Self::unsupported())
    }

    fn statistics(&self) -> Result<crate::memory::VmStatistics, SensorError> {
        Err(Self::unsupported())
    }
}
