use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "onnxfeed",
    version,
    about = "Load an ONNX model and run a single inference pass"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an input tensor from text, run the model once, print a summary
    Run {
        #[command(flatten)]
        model: ModelArgs,

        /// Input shape, comma-separated (e.g. 1,3,224,224)
        #[arg(long)]
        shape: String,

        /// Input data as a JSON array or comma-separated numbers; zeros when omitted
        #[arg(long)]
        data: Option<String>,

        /// Element type of the input tensor (float32 or int32)
        #[arg(long, default_value = "float32")]
        dtype: String,

        /// Input to feed; defaults to the model's first input
        #[arg(long)]
        input_name: Option<String>,

        /// Leading elements shown per output
        #[arg(long, default_value_t = onnxfeed_core::DEFAULT_SAMPLE_LIMIT)]
        sample: usize,
    },
    /// Load the model and list its inputs and outputs
    Inspect {
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Path to ONNX model file
    #[arg(long)]
    pub model: PathBuf,

    /// Device for inference (cpu or cuda:N)
    #[arg(long, default_value = "cpu")]
    pub device: String,

    /// Log filter; falls back to RUST_LOG, then `info`
    #[arg(long)]
    pub log: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::parse_from(["onnxfeed", "run", "--model", "m.onnx", "--shape", "1,3"]);
        let Command::Run {
            model,
            shape,
            data,
            dtype,
            input_name,
            sample,
        } = cli.command
        else {
            panic!("expected run subcommand");
        };
        assert_eq!(model.model, PathBuf::from("m.onnx"));
        assert_eq!(model.device, "cpu");
        assert_eq!(model.log, None);
        assert_eq!(shape, "1,3");
        assert_eq!(data, None);
        assert_eq!(dtype, "float32");
        assert_eq!(input_name, None);
        assert_eq!(sample, 16);
    }

    #[test]
    fn log_filter_is_optional() {
        let cli = Cli::parse_from(["onnxfeed", "inspect", "--model", "m.onnx", "--log", "debug"]);
        let Command::Inspect { model } = cli.command else {
            panic!("expected inspect subcommand");
        };
        assert_eq!(model.log.as_deref(), Some("debug"));
    }

    #[test]
    fn shape_is_required_for_run() {
        let res = Cli::try_parse_from(["onnxfeed", "run", "--model", "m.onnx"]);
        assert!(res.is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
