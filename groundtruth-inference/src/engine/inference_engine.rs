use anyhow::{Context, Result};
use log::info;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
    TensorRTExecutionProvider,
};
use ort::session::Session;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::path::Path;

pub struct OnnxSession {
    pub(crate) session: Session,
    pub(crate) executor: ExecutionProvider,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionProvider {
    #[default]
    #[serde(rename = "cpu")]
    CPU,
    #[serde(rename = "cuda")]
    CUDA(i32),
    #[serde(rename = "tensorrt")]
    TensorRT(i32),
}

impl Deref for OnnxSession {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for OnnxSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl ExecutionProvider {
    /// Registration for the session builder. Fails the build instead of
    /// silently falling back to CPU when the device is unavailable.
    fn dispatch(self) -> ExecutionProviderDispatch {
        let dispatch = match self {
            ExecutionProvider::CPU => CPUExecutionProvider::default().build(),
            ExecutionProvider::CUDA(device) => CUDAExecutionProvider::default()
                .with_device_id(device)
                .build(),
            ExecutionProvider::TensorRT(device) => TensorRTExecutionProvider::default()
                .with_device_id(device)
                .build(),
        };
        dispatch.error_on_failure()
    }
}

impl OnnxSession {
    pub fn new(
        model_path: impl AsRef<Path>,
        executor: ExecutionProvider,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let session = Session::builder()?
            .with_intra_threads(intra_threads)?
            .with_execution_providers([executor.dispatch()])?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load model {}", model_path.display()))?;

        info!("Loaded {} on {:?}", model_path.display(), executor);
        Ok(OnnxSession { session, executor })
    }

    pub fn executor(&self) -> ExecutionProvider {
        self.executor
    }
}
