//! Memory usage sampling for sketchysensor-rs.
//!
//! This crate samples host-level virtual-memory statistics (Mach host
//! statistics on macOS, `/proc/vmstat` on Linux), derives used/free/percentage
//! figures and exposes them as SketchyBar event fields.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sketchysensor_memory::MemorySampler;
//! use sketchysensor_core::Sampler;
//!
//! let mut sampler = MemorySampler::from_host()?;
//! sampler.refresh()?;
//!
//! for field in sampler.fields() {
//!     println!("{field}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod host;
pub mod memory;

pub use host::{host_provider, HostMemory};
pub use memory::{MemorySampler, MemorySnapshot, VmStatistics, VmStatsProvider};
