//! Peak guest memory tracking

/// Running maximum of sampled guest memory sizes
///
/// Sampled from low-frequency host calls (the clock and the input feed)
/// instead of on every access, so the guest's behavior is never affected.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMonitor {
    peak: u64,
    samples: u64,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a memory size; returns true when it raised the peak
    pub fn sample(&mut self, memory_bytes: u64) -> bool {
        self.samples += 1;
        if memory_bytes > self.peak {
            self.peak = memory_bytes;
            return true;
        }
        false
    }

    /// Peak memory seen so far
    pub fn report(&self) -> u64 {
        self.peak
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_is_max_of_samples() {
        let mut monitor = MemoryMonitor::new();
        let samples = [65536u64, 131072, 65536, 196608, 0, 131072];

        let mut last = 0;
        for s in samples {
            monitor.sample(s);
            assert!(monitor.report() >= last);
            last = monitor.report();
        }

        assert_eq!(monitor.report(), 196608);
        assert_eq!(monitor.samples(), 6);
    }

    #[test]
    fn test_sample_reports_increase() {
        let mut monitor = MemoryMonitor::new();
        assert!(monitor.sample(10));
        assert!(!monitor.sample(10));
        assert!(!monitor.sample(5));
        assert!(monitor.sample(11));
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(MemoryMonitor::new().report(), 0);
    }
}
