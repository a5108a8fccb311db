use crate::capture::encoder::MASTER_PLAYLIST;
use std::path::Path;
use std::time::SystemTime;

/// Snapshot of how recently a session produced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessReport {
    /// Age of the newest output artifact. `None` means no artifact exists
    /// yet, which callers must treat as unbounded age.
    pub output_age_ms: Option<u64>,
    /// Age of the newest media segment specifically; `None` until the
    /// encoder has written its first segment.
    pub last_segment_age_ms: Option<u64>,
    /// Number of segments currently in the rolling window.
    pub segment_count: usize,
}

impl FreshnessReport {
    pub fn is_fresh(&self, max_age_ms: u64) -> bool {
        matches!(self.output_age_ms, Some(age) if age <= max_age_ms)
    }
}

/// Read-only inspection of a session's working directory.
///
/// The monitor is a pure function of filesystem state; it never writes and is
/// safe to call concurrently from status queries and the health loop.
pub struct FreshnessMonitor;

impl FreshnessMonitor {
    /// Computes the freshness report for one session directory.
    ///
    /// Newest segment mtime wins; when no segment exists yet the master
    /// playlist mtime is used instead, and when not even the playlist exists
    /// the age is reported as unbounded (`None`). Ages are clamped at zero
    /// so clock skew can never produce a negative value.
    pub fn check(dir: &Path) -> FreshnessReport {
        let now = SystemTime::now();

        let mut newest_segment: Option<SystemTime> = None;
        let mut segment_count = 0;
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|ext| ext == "ts").unwrap_or(false) {
                    segment_count += 1;
                    if let Ok(mtime) = entry.metadata().and_then(|m| m.modified()) {
                        if newest_segment.map(|cur| mtime > cur).unwrap_or(true) {
                            newest_segment = Some(mtime);
                        }
                    }
                }
            }
        }

        let age_of = |mtime: SystemTime| -> u64 {
            now.duration_since(mtime)
                .map(|age| age.as_millis() as u64)
                .unwrap_or(0)
        };

        let last_segment_age_ms = newest_segment.map(age_of);
        let output_age_ms = match last_segment_age_ms {
            Some(age) => Some(age),
            None => std::fs::metadata(dir.join(MASTER_PLAYLIST))
                .and_then(|m| m.modified())
                .ok()
                .map(age_of),
        };

        FreshnessReport {
            output_age_ms,
            last_segment_age_ms,
            segment_count,
        }
    }
}
