// Sample buffer shared by the sampling step (single writer) and the minute fold (reader/clearer).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::gpu_repo::{self, GpuProbe};

/// In-memory samples captured since the last fold.
/// `drain` swaps the buffer out under the lock, so a concurrent `push` lands
/// either wholly before the swap (folded now) or after it (folded next minute).
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    inner: Arc<Mutex<Vec<f64>>>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: f64) {
        self.lock().push(value);
    }

    /// Take every buffered sample, leaving the buffer empty.
    pub fn drain(&self) -> Vec<f64> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<f64>> {
        // A panic while holding the lock leaves a Vec that is still valid to use.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Query the GPU once and buffer the reading. Failures drop the sample; returns whether one was kept.
pub async fn sample_once<P: GpuProbe>(
    probe: &Arc<P>,
    timeout: Duration,
    buffer: &SampleBuffer,
) -> bool {
    match gpu_repo::sample(probe.clone(), timeout).await {
        Ok(value) => {
            buffer.push(value);
            true
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                operation = "sample_gpu",
                "GPU sample dropped"
            );
            false
        }
    }
}
