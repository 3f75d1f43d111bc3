//! Per-run counters

use std::fmt;

/// Counters kept while a reaper runs one task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Codes taken from the generator
    pub codes_examined: u64,

    /// Codes whose URL was written to the result stream
    pub urls_found: u64,
}

impl RunStats {
    /// Fraction of examined codes that produced a record, as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.codes_examined == 0 {
            0.0
        } else {
            (self.urls_found as f64 / self.codes_examined as f64) * 100.0
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} codes examined, {} URLs found ({:.1}%)",
            self.codes_examined,
            self.urls_found,
            self.hit_rate()
        )
    }
}
