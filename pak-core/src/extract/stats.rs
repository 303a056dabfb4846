//! Running counters for one extraction scope (a single container or the
//! whole run).

use std::time::{Duration, Instant};

#[derive(Clone, Debug, Default)]
pub struct ExtractionStats {
    start: Option<Instant>,
    end: Option<Instant>,
    files_extracted: u64,
    bytes_extracted: u64,
    files_to_extract: u64,
    bytes_to_extract: u64,
}

/// Point-in-time copy handed to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub files_extracted: u64,
    pub bytes_extracted: u64,
    pub files_to_extract: u64,
    pub bytes_to_extract: u64,
    pub elapsed: Duration,
    /// Projected total duration. `None` until at least one byte lands.
    pub eta: Option<Duration>,
}

impl ExtractionStats {
    pub fn start(&mut self, files_to_extract: u64, bytes_to_extract: u64) {
        self.start = Some(Instant::now());
        self.end = None;
        self.files_to_extract = files_to_extract;
        self.bytes_to_extract = bytes_to_extract;
        self.files_extracted = 0;
        self.bytes_extracted = 0;
    }

    pub fn stop(&mut self) {
        self.end = Some(Instant::now());
    }

    pub fn add_file(&mut self) {
        self.files_extracted += 1;
    }

    pub fn add_bytes(&mut self, bytes: u64) {
        self.bytes_extracted += bytes;
    }

    pub fn elapsed(&self) -> Duration {
        match self.start {
            Some(start) => self.end.unwrap_or_else(Instant::now) - start,
            None => Duration::ZERO,
        }
    }

    /// Projected total run time, scaling elapsed time by the fraction of
    /// bytes still outstanding. Undefined before the first byte.
    pub fn eta(&self) -> Option<Duration> {
        if self.bytes_extracted == 0 {
            return None;
        }
        let scale = self.bytes_to_extract as f64 / self.bytes_extracted as f64;
        Some(self.elapsed().mul_f64(scale))
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files_extracted: self.files_extracted,
            bytes_extracted: self.bytes_extracted,
            files_to_extract: self.files_to_extract,
            bytes_to_extract: self.bytes_to_extract,
            elapsed: self.elapsed(),
            eta: self.eta(),
        }
    }
}
