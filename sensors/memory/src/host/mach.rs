//! macOS statistics provider backed by the Mach host interface.

use crate::memory::{VmStatistics, VmStatsProvider};
use libc::{c_int, c_uint, c_void};
use sketchysensor_core::SensorError;
use std::{io, mem, ptr};

type MachPort = c_uint;
type KernReturn = c_int;
type Natural = c_uint;
type Integer = c_int;

const KERN_SUCCESS: KernReturn = 0;
const HOST_VM_INFO64: c_int = 4;

/// Layout of `vm_statistics64_data_t` from `<mach/vm_statistics.h>`.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
#[allow(dead_code)]
struct RawVmStatistics64 {
    free_count: Natural,
    active_count: Natural,
    inactive_count: Natural,
    wire_count: Natural,
    zero_fill_count: u64,
    reactivations: u64,
    pageins: u64,
    pageouts: u64,
    faults: u64,
    cow_faults: u64,
    lookups: u64,
    hits: u64,
    purges: u64,
    purgeable_count: Natural,
    speculative_count: Natural,
    decompressions: u64,
    compressions: u64,
    swapins: u64,
    swapouts: u64,
    compressor_page_count: Natural,
    throttled_count: Natural,
    external_page_count: Natural,
    internal_page_count: Natural,
    total_uncompressed_pages_in_compressor: u64,
}

const HOST_VM_INFO64_COUNT: Natural =
    (mem::size_of::<RawVmStatistics64>() / mem::size_of::<Integer>()) as Natural;

extern "C" {
    fn mach_host_self() -> MachPort;
    fn host_page_size(host: MachPort, out_page_size: *mut libc::uintptr_t) -> KernReturn;
    fn host_statistics64(
        host: MachPort,
        flavor: c_int,
        host_info_out: *mut Integer,
        host_info_out_count: *mut Natural,
    ) -> KernReturn;
}

/// Handle to the Mach host port, acquired once and held for the process lifetime.
///
/// The port is a send right the kernel reclaims on exit.
#[derive(Debug)]
pub struct MachHost {
    host: MachPort,
}

impl MachHost {
    /// Acquire the host port.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Unavailable`] if the kernel hands back a null port.
    pub fn open() -> Result<Self, SensorError> {
        // SAFETY: mach_host_self has no preconditions.
        let host = unsafe { mach_host_self() };
        if host == 0 {
            return Err(SensorError::unavailable("mach_host_self returned a null port"));
        }
        Ok(Self { host })
    }
}

impl VmStatsProvider for MachHost {
    fn page_size(&self) -> Result<u64, SensorError> {
        let mut page_size: libc::uintptr_t = 0;
        // SAFETY: page_size is a valid out pointer for the duration of the call.
        let status = unsafe { host_page_size(self.host, &mut page_size) };
        if status != KERN_SUCCESS {
            return Err(SensorError::query("host_page_size", status));
        }
        Ok(page_size as u64)
    }

    fn total_memory(&self) -> Result<u64, SensorError> {
        let mut mib = [libc::CTL_HW, libc::HW_MEMSIZE];
        let mut total: u64 = 0;
        let mut length = mem::size_of::<u64>();

        // SAFETY: total and length describe a buffer of exactly length bytes.
        let rc = unsafe {
            libc::sysctl(
                mib.as_mut_ptr(),
                mib.len() as c_uint,
                ptr::addr_of_mut!(total).cast::<c_void>(),
                &mut length,
                ptr::null_mut(),
                0,
            )
        };
        if rc != 0 {
            return Err(SensorError::Io(io::Error::last_os_error()));
        }
        Ok(total)
    }

    fn statistics(&self) -> Result<VmStatistics, SensorError> {
        let mut raw = RawVmStatistics64::default();
        let mut count = HOST_VM_INFO64_COUNT;

        // SAFETY: raw is a vm_statistics64 sized buffer and count holds its size in integer_t units.
        let status = unsafe {
            host_statistics64(
                self.host,
                HOST_VM_INFO64,
                ptr::addr_of_mut!(raw).cast::<Integer>(),
                &mut count,
            )
        };
        if status != KERN_SUCCESS {
            return Err(SensorError::query("host_statistics64", status));
        }

        Ok(VmStatistics {
            active: u64::from(raw.active_count),
            inactive: u64::from(raw.inactive_count),
            wired: u64::from(raw.wire_count),
            free: u64::from(raw.free_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_layout_matches_kernel_count() {
        assert_eq!(HOST_VM_INFO64_COUNT, 38);
    }

    #[test]
    fn test_host_statistics() {
        let host = MachHost::open().unwrap();
        let page_size = host.page_size().unwrap();
        let total = host.total_memory().unwrap();
        let stats = host.statistics().unwrap();

        assert!(page_size.is_power_of_two());
        assert!(total > 0);
        assert!(stats.used_pages() > 0);
    }
}
