//! Traffic statistics for the bridge
//!
//! Thread-safe counters for link and decode activity.
//! Uses lock-free atomics for all operations.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one bridge lifetime (fully lock-free)
#[derive(Debug, Default)]
pub struct Stats {
    /// Total bytes received from the device
    rx_bytes: AtomicU64,
    /// Complete frames decoded
    frames: AtomicU64,
    /// Frames dropped on checksum mismatch
    checksum_errors: AtomicU64,
    /// Telemetry records published
    records: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_rx(&self, bytes: usize) {
        self.rx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_checksum_error(&self) {
        self.checksum_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_record(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes.load(Ordering::Relaxed)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn checksum_errors(&self) -> u64 {
        self.checksum_errors.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// One-line summary for periodic logging
    pub fn summary(&self) -> String {
        format!(
            "rx {} B, {} frames ({} bad), {} records",
            self.rx_bytes(),
            self.frames(),
            self.checksum_errors(),
            self.records()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new();
        stats.add_rx(10);
        stats.add_rx(5);
        stats.add_frame();
        stats.add_checksum_error();
        stats.add_record();

        assert_eq!(stats.rx_bytes(), 15);
        assert_eq!(stats.frames(), 1);
        assert_eq!(stats.checksum_errors(), 1);
        assert_eq!(stats.records(), 1);
    }

    #[test]
    fn summary_mentions_counts() {
        let stats = Stats::new();
        stats.add_frame();
        assert!(stats.summary().contains("1 frames"));
    }
}
