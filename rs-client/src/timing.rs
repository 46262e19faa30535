use std::time::Instant;

use tracing::info;

/// Wall-clock timer for a named build step. Compiles to a no-op without the
/// `perf_timing` feature.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    label: &'static str,
    start: Option<Instant>,
}

impl Stopwatch {
    #[inline]
    pub fn start(label: &'static str) -> Self {
        #[cfg(feature = "perf_timing")]
        {
            Self {
                label,
                start: Some(Instant::now()),
            }
        }
        #[cfg(not(feature = "perf_timing"))]
        {
            Self { label, start: None }
        }
    }

    #[inline]
    pub fn ms(&self) -> f32 {
        self.start
            .map(|t| t.elapsed().as_secs_f32() * 1000.0)
            .unwrap_or(0.0)
    }

    pub fn finish(self) {
        if self.start.is_some() {
            info!(step = self.label, elapsed_ms = self.ms(), "finished");
        }
    }
}
