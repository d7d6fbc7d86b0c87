use anyhow::anyhow;
use onnxfeed_core::{Backend, BackendModel, Device, IOName, ModelArtifact, ModelSpec, Tensor};
use tracing::info;

use crate::RunError;

/// A backend plus the model it loaded, passed explicitly to each run.
///
/// The model is loaded on first use and kept until `reset`. Its first
/// declared input becomes the default input name.
pub struct SessionHandle<B: Backend> {
    backend: B,
    artifact: ModelArtifact,
    device: Device,
    model: Option<B::Model>,
    default_input: Option<IOName>,
}

impl<B: Backend> SessionHandle<B> {
    pub fn new(backend: B, artifact: ModelArtifact, device: Device) -> Self {
        Self {
            backend,
            artifact,
            device,
            model: None,
            default_input: None,
        }
    }

    pub fn spec(&self) -> Option<&ModelSpec> {
        self.model.as_ref().map(|m| m.spec())
    }

    pub fn ensure_loaded(&mut self) -> Result<&ModelSpec, RunError> {
        let model = match self.model.take() {
            Some(model) => model,
            None => {
                info!(
                    backend = self.backend.name(),
                    model = %self.artifact.describe(),
                    device = %self.device,
                    "loading model"
                );
                let model = self
                    .backend
                    .load(&self.artifact, self.device.clone())
                    .map_err(RunError::Load)?;
                info!(inputs = %model.spec().input_names().join(", "), "model loaded");
                self.default_input = model.spec().inputs.first().map(|i| i.name.clone());
                model
            }
        };
        Ok(self.model.insert(model).spec())
    }

    /// Forgets the loaded model so the next run loads it again.
    pub fn reset(&mut self) {
        self.model = None;
        self.default_input = None;
    }

    /// Picks the input to feed: a non-blank override, else the default.
    pub fn resolve_input_name(&self, requested: Option<&str>) -> Result<IOName, RunError> {
        let requested = requested.map(str::trim).filter(|s| !s.is_empty());
        match (requested, self.spec()) {
            (Some(name), Some(spec)) if spec.input(name).is_none() => {
                Err(RunError::UnknownInput {
                    name: name.to_string(),
                    available: spec.input_names().join(", "),
                })
            }
            (Some(name), _) => Ok(IOName(name.to_string())),
            (None, _) => self.default_input.clone().ok_or(RunError::NoInputs),
        }
    }

    pub fn infer(
        &mut self,
        feed: Vec<(IOName, Tensor)>,
    ) -> Result<Vec<(IOName, Tensor)>, RunError> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| RunError::Inference(anyhow!("model is not loaded")))?;
        model.infer(feed).map_err(RunError::Inference)
    }
}
