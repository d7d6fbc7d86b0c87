use anyhow::Result;

use crate::{Device, IOName, ModelArtifact, ModelSpec, Tensor};

pub trait Backend: Send + Sync + 'static {
    type Model: BackendModel;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model>;
}

pub trait BackendModel: Send + 'static {
    fn spec(&self) -> &ModelSpec;

    /// Runs one pass over a named feed; outputs come back in model order.
    fn infer(&mut self, feed: Vec<(IOName, Tensor)>) -> Result<Vec<(IOName, Tensor)>>;
}
