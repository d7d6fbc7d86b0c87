mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use cli::{Cli, Command, ModelArgs};
use onnxfeed_backend_ort::OrtBackend;
use onnxfeed_core::{render_json, Device, ModelArtifact, ModelSpec, TensorSpec};
use onnxfeed_runtime::{RunRequest, Runner, RunnerConfig};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            model,
            shape,
            data,
            dtype,
            input_name,
            sample,
        } => {
            init_logging(model.log.as_deref());
            let request = RunRequest {
                shape,
                data: data.unwrap_or_default(),
                dtype,
                input_name,
            };
            run(model, request, sample).await
        }
        Command::Inspect { model } => {
            init_logging(model.log.as_deref());
            inspect(model).await
        }
    }
}

fn init_logging(log: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(log))
        .with_writer(std::io::stderr)
        .init();
}

/// `--log` wins, then RUST_LOG, then `info`.
fn log_filter(log: Option<&str>) -> EnvFilter {
    match log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

async fn run(model: ModelArgs, request: RunRequest, sample_limit: usize) -> Result<()> {
    let config = RunnerConfig {
        device: parse_device(&model.device)?,
        sample_limit,
    };
    // Read up front so a missing file is reported before anything else.
    let artifact = ModelArtifact::OnnxBytes(read_model(&model.model).await?);
    let runner = Runner::new(OrtBackend::new(), artifact, config);

    let report = match runner.run(request).await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            return Err(err.into());
        }
    };

    tracing::info!(
        input = %report.input_name,
        "run succeeded in {:.1} ms",
        report.elapsed.as_secs_f64() * 1000.0
    );
    println!("{}", render_json(&report.outputs)?);
    Ok(())
}

async fn inspect(model: ModelArgs) -> Result<()> {
    let config = RunnerConfig {
        device: parse_device(&model.device)?,
        ..RunnerConfig::default()
    };
    let artifact = ModelArtifact::OnnxPath(model.model);
    let runner = Runner::new(OrtBackend::new(), artifact, config);

    let spec = runner.inspect().await?;
    println!("{}", serde_json::to_string_pretty(&describe_spec(&spec))?);
    Ok(())
}

async fn read_model(path: &Path) -> Result<Bytes> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read model file {}", path.display()))?;
    Ok(Bytes::from(raw))
}

fn describe_spec(spec: &ModelSpec) -> Value {
    let io = |specs: &[TensorSpec]| -> Vec<Value> {
        specs
            .iter()
            .map(|t| json!({ "name": t.name.as_str(), "dtype": t.dtype.as_str(), "dims": t.dims }))
            .collect()
    };
    json!({ "inputs": io(&spec.inputs), "outputs": io(&spec.outputs) })
}

fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    anyhow::bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnxfeed_core::{DType, IOName};

    #[test]
    fn parses_devices() {
        assert_eq!(parse_device("CPU").unwrap(), Device::Cpu);
        assert_eq!(parse_device("cuda:1").unwrap(), Device::Cuda { device_id: 1 });
        assert!(parse_device("cuda:x").is_err());
        assert!(parse_device("webgl").is_err());
    }

    #[test]
    fn explicit_log_flag_sets_the_filter() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
    }

    #[test]
    fn spec_description_marks_dynamic_dims_null() {
        let spec = ModelSpec {
            inputs: vec![TensorSpec {
                name: IOName("images".into()),
                dtype: DType::F32,
                dims: vec![None, Some(3), Some(224), Some(224)],
            }],
            outputs: vec![],
        };
        assert_eq!(
            describe_spec(&spec),
            json!({
                "inputs": [{ "name": "images", "dtype": "float32", "dims": [null, 3, 224, 224] }],
                "outputs": [],
            })
        );
    }

    #[tokio::test]
    async fn missing_model_file_is_reported() {
        let err = read_model(Path::new("/nonexistent/model.onnx"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot read model file"));
    }
}
