//! Memory usage sampler for sketchysensor-rs.
//!
//! This module turns raw virtual-memory page counts into the figures published
//! to the bar: used bytes, free bytes and a usage percentage. Memory counted as
//! "used" is the sum of active, inactive and wired pages.

use crate::host::{self, HostMemory};
use serde::Serialize;
use sketchysensor_core::{format, EventField, Sampler, SensorError};

/// Page counts by state, as reported by the kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VmStatistics {
    /// Pages recently referenced
    pub active: u64,
    /// Pages not recently referenced but still holding data
    pub inactive: u64,
    /// Pages that cannot be paged out
    pub wired: u64,
    /// Pages on the free list (reported, not counted as used)
    pub free: u64,
}

impl VmStatistics {
    /// Pages counted as used: active + inactive + wired.
    #[must_use]
    pub const fn used_pages(&self) -> u64 {
        self.active
            .saturating_add(self.inactive)
            .saturating_add(self.wired)
    }
}

/// Source of virtual-memory statistics for the local host.
pub trait VmStatsProvider {
    /// Bytes per virtual-memory page.
    fn page_size(&self) -> Result<u64, SensorError>;

    /// Installed physical memory in bytes.
    fn total_memory(&self) -> Result<u64, SensorError>;

    /// Current page counts.
    fn statistics(&self) -> Result<VmStatistics, SensorError>;
}

/// Point-in-time view of system memory usage.
///
/// `page_size` and `total_memory_bytes` are fixed when the snapshot is created;
/// the derived figures start at zero and change only through a successful
/// refresh. `used_memory_bytes + free_memory_bytes == total_memory_bytes`
/// holds whenever the kernel does not report more used pages than exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    page_size: u64,
    total_memory_bytes: u64,
    used_memory_bytes: u64,
    free_memory_bytes: u64,
    memory_percent: u32,
}

impl MemorySnapshot {
    fn new(page_size: u64, total_memory_bytes: u64) -> Self {
        Self {
            page_size,
            total_memory_bytes,
            used_memory_bytes: 0,
            free_memory_bytes: 0,
            memory_percent: 0,
        }
    }

    /// Bytes per page.
    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Installed physical memory in bytes.
    #[must_use]
    pub const fn total_memory_bytes(&self) -> u64 {
        self.total_memory_bytes
    }

    /// Memory in use (active + inactive + wired) in bytes.
    #[must_use]
    pub const fn used_memory_bytes(&self) -> u64 {
        self.used_memory_bytes
    }

    /// Memory not in use in bytes.
    #[must_use]
    pub const fn free_memory_bytes(&self) -> u64 {
        self.free_memory_bytes
    }

    /// Truncated usage percentage. Can exceed 100 if the kernel overcounts.
    #[must_use]
    pub const fn memory_percent(&self) -> u32 {
        self.memory_percent
    }

    /// Recompute the derived figures from `stats`.
    ///
    /// Returns `false` when the used pages exceed total memory; free memory is
    /// then clamped to zero.
    fn apply(&mut self, stats: &VmStatistics) -> bool {
        let used = stats.used_pages().saturating_mul(self.page_size);

        self.used_memory_bytes = used;
        self.free_memory_bytes = self.total_memory_bytes.saturating_sub(used);
        self.memory_percent = usage_percent(used, self.total_memory_bytes);

        used <= self.total_memory_bytes
    }
}

/// `floor(used / total * 100)` computed in floating point.
fn usage_percent(used: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (used as f64 / total as f64 * 100.0) as u32
}

/// Memory usage sampler holding a statistics provider and the latest snapshot.
///
/// # Examples
///
/// ```rust,no_run
/// use sketchysensor_memory::MemorySampler;
///
/// let mut sampler = MemorySampler::from_host()?;
/// sampler.refresh()?;
/// println!("Memory usage: {}%", sampler.snapshot().memory_percent());
/// # Ok::<(), sketchysensor_core::SensorError>(())
/// ```
#[derive(Debug)]
pub struct MemorySampler<P> {
    name: String,
    provider: P,
    snapshot: MemorySnapshot,
}

impl MemorySampler<HostMemory> {
    /// Initialize a sampler over the statistics of the running host.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Unavailable`] on unsupported platforms, or the
    /// errors of [`MemorySampler::initialize`].
    pub fn from_host() -> Result<Self, SensorError> {
        Self::initialize(host::host_provider()?)
    }
}

impl<P: VmStatsProvider> MemorySampler<P> {
    /// Resolve page size and total memory once and build an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Initialization`] if either value cannot be
    /// determined or is zero.
    pub fn initialize(provider: P) -> Result<Self, SensorError> {
        let page_size = provider
            .page_size()
            .map_err(|e| SensorError::initialization(format!("could not determine page size: {e}")))?;
        if page_size == 0 {
            return Err(SensorError::initialization("page size reported as zero"));
        }

        let total_memory = provider
            .total_memory()
            .map_err(|e| SensorError::initialization(format!("could not determine total memory: {e}")))?;
        if total_memory == 0 {
            return Err(SensorError::initialization("total memory reported as zero"));
        }

        tracing::debug!(
            page_size,
            total_memory = %format::bytes_to_human(total_memory),
            "memory sampler initialized"
        );

        Ok(Self {
            name: "memory".to_owned(),
            provider,
            snapshot: MemorySnapshot::new(page_size, total_memory),
        })
    }

    /// Re-read live statistics and update the snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns the provider's error when the statistics query fails; the
    /// snapshot is left exactly as it was.
    pub fn refresh(&mut self) -> Result<(), SensorError> {
        let stats = self.provider.statistics()?;

        if !self.snapshot.apply(&stats) {
            tracing::warn!(
                used_pages = stats.used_pages(),
                page_size = self.snapshot.page_size,
                total_memory = self.snapshot.total_memory_bytes,
                "kernel reported more used pages than physical memory"
            );
        }

        tracing::debug!(
            used = %format::bytes_to_human(self.snapshot.used_memory_bytes),
            free = %format::bytes_to_human(self.snapshot.free_memory_bytes),
            percent = self.snapshot.memory_percent,
            "memory sampled"
        );
        Ok(())
    }

    /// The most recently computed figures.
    pub fn snapshot(&self) -> &MemorySnapshot {
        &self.snapshot
    }
}

impl<P: VmStatsProvider> Sampler for MemorySampler<P> {
    type Error = SensorError;

    fn name(&self) -> &str {
        &self.name
    }

    fn refresh(&mut self) -> Result<(), Self::Error> {
        MemorySampler::refresh(self)
    }

    fn fields(&self) -> Vec<EventField> {
        vec![
            EventField::new("memory_percent", format::percent_field(self.snapshot.memory_percent)),
            EventField::new("used_memory", self.snapshot.used_memory_bytes.to_string()),
            EventField::new("total_memory", self.snapshot.total_memory_bytes.to_string()),
        ]
    }

    fn check_availability(&self) -> Result<(), Self::Error> {
        self.provider.statistics().map(drop)
    }
}
