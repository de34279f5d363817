//! Parser for the Linux `/proc/vmstat` format.

use crate::memory::VmStatistics;
use sketchysensor_core::SensorError;

/// Keys that must be present for the counts to be meaningful.
const REQUIRED_KEYS: &[&str] = &[
    "nr_active_anon",
    "nr_active_file",
    "nr_inactive_anon",
    "nr_inactive_file",
];

/// Parse page counts from `/proc/vmstat` content.
///
/// Active and inactive pages combine the anonymous and file-backed LRU lists;
/// wired pages are the unevictable list.
///
/// # Errors
///
/// Returns [`SensorError::Parse`] if a relevant value is not a number or a
/// required key is missing.
///
/// # Examples
///
/// ```rust
/// use sketchysensor_memory::host::parse_vmstat;
///
/// let stats = parse_vmstat(
///     "nr_free_pages 10\nnr_inactive_anon 1\nnr_active_anon 2\n\
///      nr_inactive_file 3\nnr_active_file 4\nnr_unevictable 5\n",
/// )?;
/// assert_eq!(stats.used_pages(), 15);
/// # Ok::<(), sketchysensor_core::SensorError>(())
/// ```
pub fn parse_vmstat(content: &str) -> Result<VmStatistics, SensorError> {
    let mut stats = VmStatistics::default();
    let mut seen = 0usize;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };

        let slot = match key {
            "nr_active_anon" | "nr_active_file" => &mut stats.active,
            "nr_inactive_anon" | "nr_inactive_file" => &mut stats.inactive,
            "nr_unevictable" => &mut stats.wired,
            "nr_free_pages" => &mut stats.free,
            _ => continue,
        };

        let pages = value
            .parse::<u64>()
            .map_err(|e| SensorError::parse_with_source(format!("Failed to parse {key} value"), e))?;
        *slot = slot.saturating_add(pages);

        if REQUIRED_KEYS.contains(&key) {
            seen += 1;
        }
    }

    if seen < REQUIRED_KEYS.len() {
        return Err(SensorError::parse(format!(
            "vmstat is missing one of {}",
            REQUIRED_KEYS.join(", ")
        )));
    }

    Ok(stats)
}
