use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use onnxfeed_core::{
    assemble_input, summarize, Backend, Device, IOName, ModelArtifact, ModelSpec, OutputSummary,
    DEFAULT_SAMPLE_LIMIT,
};
use tracing::{debug, info, warn};

use crate::{RunError, RunGate, RunPermit, RunState, SessionHandle};

#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub device: Device,
    /// Leading elements kept per output in the summary.
    pub sample_limit: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

/// The raw text a user supplied for one run.
#[derive(Clone, Debug, Default)]
pub struct RunRequest {
    pub shape: String,
    pub data: String,
    pub dtype: String,
    pub input_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub input_name: IOName,
    pub elapsed: Duration,
    pub outputs: Vec<OutputSummary>,
}

pub struct Runner<B: Backend> {
    session: Arc<Mutex<SessionHandle<B>>>,
    gate: RunGate,
    config: RunnerConfig,
}

impl<B: Backend> Runner<B> {
    pub fn new(backend: B, artifact: ModelArtifact, config: RunnerConfig) -> Self {
        let session = SessionHandle::new(backend, artifact, config.device.clone());
        Self {
            session: Arc::new(Mutex::new(session)),
            gate: RunGate::new(),
            config,
        }
    }

    pub fn state(&self) -> RunState {
        self.gate.state()
    }

    /// Loads the model (if needed) and returns its declared IO.
    pub async fn inspect(&self) -> Result<ModelSpec, RunError> {
        let permit = self.gate.try_begin()?;
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let _permit: RunPermit = permit;
            let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
            load_or_reset(&mut *session)?;
            session
                .spec()
                .cloned()
                .ok_or_else(|| RunError::Load(anyhow::anyhow!("model unavailable after load")))
        })
        .await
        .map_err(|e| RunError::Panicked(e.to_string()))?
    }

    /// One full pass: load, assemble the input, infer, summarize.
    pub async fn run(&self, request: RunRequest) -> Result<RunReport, RunError> {
        let permit = self.gate.try_begin()?;
        let session = Arc::clone(&self.session);
        let sample_limit = self.config.sample_limit;
        tokio::task::spawn_blocking(move || {
            let _permit: RunPermit = permit;
            let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
            run_blocking(&mut *session, request, sample_limit)
        })
        .await
        .map_err(|e| RunError::Panicked(e.to_string()))?
    }
}

fn load_or_reset<B: Backend>(session: &mut SessionHandle<B>) -> Result<(), RunError> {
    let loaded = session.ensure_loaded().map(|_| ());
    if let Err(err) = loaded {
        warn!(error = %err, "model load failed, session reset");
        session.reset();
        return Err(err);
    }
    Ok(())
}

fn run_blocking<B: Backend>(
    session: &mut SessionHandle<B>,
    request: RunRequest,
    sample_limit: usize,
) -> Result<RunReport, RunError> {
    load_or_reset(session)?;

    let feed = assemble_input(&request.shape, &request.data, &request.dtype)?;
    let input_name = session.resolve_input_name(request.input_name.as_deref())?;
    debug!(
        input = %input_name,
        shape = %feed.shape,
        dtype = %feed.buffer.tag(),
        "input assembled"
    );

    let t0 = Instant::now();
    let outputs = session.infer(vec![(input_name.clone(), feed.into_tensor())])?;
    let elapsed = t0.elapsed();
    info!(
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        outputs = outputs.len(),
        "run complete"
    );

    Ok(RunReport {
        input_name,
        elapsed,
        outputs: summarize(&outputs, sample_limit),
    })
}
