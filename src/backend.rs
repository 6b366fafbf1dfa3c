// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Inference backend selection.
//!
//! A pose estimator may need a compute backend before first use. Backends are tried in the
//! configured order and the first one that initializes wins.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TrainerError};
use crate::estimator::EstimatorFactory;
use crate::utils::FallbackAttempts;
use crate::verbose;

/// Compute backend for pose estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// GPU through WebGL-style shaders.
    WebGl,
    /// GPU through WebGPU.
    WebGpu,
    /// WebAssembly SIMD on the CPU.
    Wasm,
    /// Plain CPU kernels.
    Cpu,
}

/// Default fallback order: GPU first, then WebAssembly, then plain CPU.
pub const DEFAULT_BACKENDS: [Backend; 3] = [Backend::WebGl, Backend::Wasm, Backend::Cpu];

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebGl => write!(f, "webgl"),
            Self::WebGpu => write!(f, "webgpu"),
            Self::Wasm => write!(f, "wasm"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "webgl" => Ok(Self::WebGl),
            "webgpu" => Ok(Self::WebGpu),
            "wasm" => Ok(Self::Wasm),
            "cpu" => Ok(Self::Cpu),
            _ => Err(format!("Unknown backend: {s}")),
        }
    }
}

/// Parse a comma-separated backend list such as `"webgl,wasm,cpu"`.
///
/// # Errors
///
/// Returns [`TrainerError::ConfigError`] on an unknown backend name.
pub fn parse_backend_list(list: &str) -> Result<Vec<Backend>> {
    list.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.parse().map_err(TrainerError::ConfigError))
        .collect()
}

/// Initialize an estimator on the first backend that works.
///
/// Candidates are tried strictly in order; the first success short-circuits the rest.
///
/// # Errors
///
/// Returns [`TrainerError::BackendError`] listing every failed attempt when no candidate
/// initializes (or the list is empty).
pub async fn select_backend<F: EstimatorFactory>(
    candidates: &[Backend],
    factory: &mut F,
) -> Result<(Backend, F::Estimator)> {
    let mut attempts = FallbackAttempts::new();
    for &backend in candidates {
        match factory.create(backend).await {
            Ok(estimator) => {
                if !attempts.is_empty() {
                    verbose!(
                        "Falling back to backend '{backend}' after {} failure(s)",
                        attempts.len()
                    );
                }
                return Ok((backend, estimator));
            }
            Err(e) => {
                verbose!("Backend '{backend}' unavailable: {e}");
                attempts.record(backend, e);
            }
        }
    }
    Err(TrainerError::BackendError(attempts.summary()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::PoseEstimator;
    use crate::camera::Frame;
    use crate::keypoint::Skeleton;

    struct NullEstimator;

    impl PoseEstimator for NullEstimator {
        async fn estimate_poses(&mut self, _frame: &Frame) -> Result<Vec<Skeleton>> {
            Ok(Vec::new())
        }
    }

    /// Factory that only succeeds for the listed backends and records every attempt.
    struct PickyFactory {
        working: Vec<Backend>,
        tried: Vec<Backend>,
    }

    impl EstimatorFactory for PickyFactory {
        type Estimator = NullEstimator;

        async fn create(&mut self, backend: Backend) -> Result<NullEstimator> {
            self.tried.push(backend);
            if self.working.contains(&backend) {
                Ok(NullEstimator)
            } else {
                Err(TrainerError::InferenceError(format!("{backend} not supported")))
            }
        }
    }

    #[test]
    fn test_parse_backend() {
        assert_eq!(Backend::from_str("webgl").unwrap(), Backend::WebGl);
        assert_eq!(Backend::from_str("WASM").unwrap(), Backend::Wasm);
        assert_eq!(Backend::from_str("cpu").unwrap(), Backend::Cpu);
        assert_eq!(Backend::from_str(" WebGPU ").unwrap(), Backend::WebGpu);
        assert!(Backend::from_str("tpu").is_err());
        assert!(Backend::from_str("cuda").is_err());
        assert!(Backend::from_str("cuda:abc").is_err());
        assert_eq!(Backend::WebGpu.to_string(), "webgpu");
    }

    #[test]
    fn test_parse_backend_list() {
        let list = parse_backend_list("webgl, wasm,cpu").unwrap();
        assert_eq!(list, DEFAULT_BACKENDS.to_vec());
        assert!(parse_backend_list("webgl,metal").is_err());
    }

    #[tokio::test]
    async fn test_select_first_working() {
        let mut factory = PickyFactory {
            working: vec![Backend::Wasm, Backend::Cpu],
            tried: Vec::new(),
        };
        let (backend, _) = select_backend(&DEFAULT_BACKENDS, &mut factory).await.unwrap();
        assert_eq!(backend, Backend::Wasm);
        // cpu is never tried once wasm succeeds
        assert_eq!(factory.tried, vec![Backend::WebGl, Backend::Wasm]);
    }

    #[tokio::test]
    async fn test_select_all_fail() {
        let mut factory = PickyFactory {
            working: vec![],
            tried: Vec::new(),
        };
        let err = select_backend(&DEFAULT_BACKENDS, &mut factory)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TrainerError::BackendError(_)));
        let msg = err.to_string();
        assert!(msg.contains("webgl"));
        assert!(msg.contains("wasm"));
        assert!(msg.contains("cpu"));
        assert_eq!(factory.tried.len(), 3);
    }
}
