// GPU utilization capability. Single GPU, queried through nvidia-smi.

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::error::SampleError;

/// Synchronous source of instantaneous GPU utilization (percent, 0..=100).
pub trait GpuProbe: Send + Sync + 'static {
    fn utilization(&self) -> Result<f64, SampleError>;
}

/// Queries `nvidia-smi` for one device.
pub struct NvidiaSmi {
    gpu_index: u32,
}

impl NvidiaSmi {
    pub fn new(gpu_index: u32) -> Self {
        Self { gpu_index }
    }
}

impl GpuProbe for NvidiaSmi {
    fn utilization(&self) -> Result<f64, SampleError> {
        let output = Command::new("nvidia-smi")
            .arg("--query-gpu=utilization.gpu")
            .arg("--format=csv,noheader,nounits")
            .arg(format!("--id={}", self.gpu_index))
            .output()
            .map_err(|e| SampleError::Query(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SampleError::Query(format!(
                "nvidia-smi exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        parse_utilization(&String::from_utf8_lossy(&output.stdout))
    }
}

/// First non-empty line of `--format=csv,noheader,nounits` output, e.g. "37\n".
pub fn parse_utilization(output: &str) -> Result<f64, SampleError> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| SampleError::Parse(output.to_string()))?;
    let value: f64 = line
        .parse()
        .map_err(|_| SampleError::Parse(line.to_string()))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(SampleError::OutOfRange(value));
    }
    Ok(value)
}

/// Runs one probe on the blocking pool; a probe that hangs past `timeout` counts as failed.
/// The hung call keeps its blocking thread, but the sampling loop moves on.
#[instrument(skip(probe), fields(repo = "gpu", operation = "sample"))]
pub async fn sample<P: GpuProbe>(probe: Arc<P>, timeout: Duration) -> Result<f64, SampleError> {
    let task = tokio::task::spawn_blocking(move || probe.utilization());
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(SampleError::Query(join_err.to_string())),
        Err(_) => Err(SampleError::Timeout(timeout.as_millis() as u64)),
    }
}
