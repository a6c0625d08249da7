use log::info;

use update_format_zip::progress::Progress;

/// Progress sink that logs whole-percent steps. Verifiers may report far
/// more often than once per percent; everything in between stays quiet.
pub struct LogProgress {
    last_percent: i64,
}

impl LogProgress {
    pub fn new() -> Self {
        Self {
            last_percent: -1,
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for LogProgress {
    fn set(&mut self, fraction: f64) {
        let percent = (fraction * 100.0) as i64;
        if percent > self.last_percent {
            info!("verifying... {percent}%");
            self.last_percent = percent;
        }
    }
}
