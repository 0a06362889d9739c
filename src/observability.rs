use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Times one phase of a run and logs its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
        duration
    }

    pub fn fail(self, error: &dyn std::fmt::Display) -> Duration {
        let duration = self.start.elapsed();
        warn!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            error = %error,
            "Operation failed"
        );
        duration
    }

    /// Log the outcome of `result` and pass it through.
    pub fn record<T, E: std::fmt::Display>(self, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => {
                self.finish();
            }
            Err(e) => {
                self.fail(e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_passes_result_through() {
        let ok: Result<u8, String> = OperationTimer::new("check").record(Ok(3));
        assert_eq!(ok, Ok(3));

        let err: Result<u8, String> = OperationTimer::new("check").record(Err("boom".to_string()));
        assert_eq!(err, Err("boom".to_string()));
    }

    #[test]
    fn test_finish_reports_elapsed() {
        let timer = OperationTimer::new("sleep");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.finish() >= Duration::from_millis(5));
    }
}
