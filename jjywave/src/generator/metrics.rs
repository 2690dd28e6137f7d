//! Transmitter health monitoring

use std::time::{Duration, Instant};

use jjywave_core::SchedulerStats;
use tracing::debug;

/// How often metrics are logged
const LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Counters kept by the transmitter thread for diagnostics
#[derive(Debug, Clone)]
pub(super) struct TransmitMetrics {
    /// Seconds rendered and handed to the sink
    pub seconds_rendered: u64,
    /// Interleaved samples rendered
    pub samples_rendered: u64,
    /// Buffers the sink refused
    pub enqueue_failures: u64,
    /// Timer wake-ups
    pub wakeups: u64,
    /// Average time to render one second (microseconds)
    pub avg_render_time_us: f64,
    /// Scheduler totals at the last wake-up
    pub scheduler: SchedulerStats,
    last_log_time: Instant,
}

impl TransmitMetrics {
    pub fn new() -> Self {
        Self {
            seconds_rendered: 0,
            samples_rendered: 0,
            enqueue_failures: 0,
            wakeups: 0,
            avg_render_time_us: 0.0,
            scheduler: SchedulerStats::default(),
            last_log_time: Instant::now(),
        }
    }

    pub fn record_render(&mut self, elapsed: Duration, samples: usize) {
        let us = elapsed.as_secs_f64() * 1_000_000.0;
        // Exponential moving average
        self.avg_render_time_us = if self.seconds_rendered == 0 {
            us
        } else {
            self.avg_render_time_us * 0.9 + us * 0.1
        };
        self.seconds_rendered += 1;
        self.samples_rendered += samples as u64;
    }

    /// Log if a full interval has passed since the last log
    pub fn maybe_log(&mut self) {
        if self.last_log_time.elapsed() >= LOG_INTERVAL {
            self.log();
            self.last_log_time = Instant::now();
        }
    }

    pub fn log(&self) {
        debug!(
            "TRANSMIT METRICS [tid={:?}]: seconds={}, samples={}, frames={}, resyncs={}, \
             wakeups={}, enqueue_failures={}, avg_render={:.1}μs",
            std::thread::current().id(),
            self.seconds_rendered,
            self.samples_rendered,
            self.scheduler.frames_built,
            self.scheduler.resyncs,
            self.wakeups,
            self.enqueue_failures,
            self.avg_render_time_us,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_average() {
        let mut metrics = TransmitMetrics::new();
        metrics.record_render(Duration::from_micros(100), 10);
        assert_eq!(metrics.avg_render_time_us, 100.0);
        metrics.record_render(Duration::from_micros(200), 10);
        assert!((metrics.avg_render_time_us - 110.0).abs() < 1e-9);
        assert_eq!(metrics.seconds_rendered, 2);
        assert_eq!(metrics.samples_rendered, 20);
    }
}
