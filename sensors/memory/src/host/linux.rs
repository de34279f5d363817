//! Linux statistics provider backed by `/proc/vmstat` and `sysconf(3)`.

use super::vmstat::parse_vmstat;
use crate::memory::{VmStatistics, VmStatsProvider};
use sketchysensor_core::SensorError;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads page counts from `/proc/vmstat`.
#[derive(Debug, Clone)]
pub struct ProcVmstat {
    path: PathBuf,
}

impl ProcVmstat {
    /// Path to the proc vmstat file.
    pub const PROC_VMSTAT_PATH: &'static str = "/proc/vmstat";

    /// Open the system vmstat file, checking that it exists.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Unavailable`] if the file does not exist.
    pub fn open() -> Result<Self, SensorError> {
        let path = Path::new(Self::PROC_VMSTAT_PATH);
        if !path.exists() {
            return Err(SensorError::unavailable(format!(
                "{} does not exist (procfs not mounted?)",
                Self::PROC_VMSTAT_PATH
            )));
        }
        Ok(Self::with_path(path))
    }

    /// Read from an alternative vmstat file (useful for testing).
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file statistics are read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Query a positive `sysconf` value.
fn sysconf(name: libc::c_int, operation: &str) -> Result<u64, SensorError> {
    // SAFETY: sysconf only reads process-wide configuration.
    let value = unsafe { libc::sysconf(name) };
    u64::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| SensorError::query(operation, -1))
}

impl VmStatsProvider for ProcVmstat {
    fn page_size(&self) -> Result<u64, SensorError> {
        sysconf(libc::_SC_PAGESIZE, "sysconf(_SC_PAGESIZE)")
    }

    fn total_memory(&self) -> Result<u64, SensorError> {
        let pages = sysconf(libc::_SC_PHYS_PAGES, "sysconf(_SC_PHYS_PAGES)")?;
        Ok(pages.saturating_mul(self.page_size()?))
    }

    fn statistics(&self) -> Result<VmStatistics, SensorError> {
        let content = fs::read_to_string(&self.path)?;
        parse_vmstat(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_page_size_and_total() {
        let provider = ProcVmstat::with_path(ProcVmstat::PROC_VMSTAT_PATH);

        let page_size = provider.page_size().unwrap();
        assert!(page_size.is_power_of_two());
        assert!(provider.total_memory().unwrap() >= page_size);
    }

    #[test]
    fn test_statistics_from_file() {
        let path = std::env::temp_dir().join(format!("sketchysensor-vmstat-{}", std::process::id()));
        fs::write(
            &path,
            "nr_inactive_anon 1\nnr_active_anon 2\nnr_inactive_file 3\nnr_active_file 4\nnr_unevictable 5\n",
        )
        .unwrap();

        let stats = ProcVmstat::with_path(&path).statistics();
        let _ = fs::remove_file(&path);

        assert_eq!(stats.unwrap().used_pages(), 15);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let provider = ProcVmstat::with_path("/nonexistent/sketchysensor/vmstat");
        assert!(matches!(provider.statistics(), Err(SensorError::Io(_))));
    }
}
