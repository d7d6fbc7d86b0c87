use anyhow::{bail, ensure, Context, Result};
use bytes::Bytes;
use onnxfeed_core::{
    Backend, BackendModel, DType, Device, IOName, ModelArtifact, ModelSpec, Shape, Tensor,
    TensorSpec,
};
use ort::{
    session::{builder::SessionBuilder, Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, ValueType},
};
use tracing::debug;

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OrtModel {
    spec: ModelSpec,
    session: Session,
}

impl Backend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        let builder = configure_session_builder(builder, &device)?;

        let session = match artifact {
            ModelArtifact::OnnxPath(path) => builder
                .commit_from_file(path)
                .with_context(|| format!("failed to load ONNX model from {}", path.display()))?,
            ModelArtifact::OnnxBytes(bytes) => builder
                .commit_from_memory(bytes)
                .context("failed to load ONNX model from memory")?,
        };

        let spec = build_model_spec(&session)?;
        debug!(
            inputs = spec.inputs.len(),
            outputs = spec.outputs.len(),
            %device,
            "ORT session ready"
        );

        Ok(OrtModel { spec, session })
    }
}

impl BackendModel for OrtModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn infer(&mut self, feed: Vec<(IOName, Tensor)>) -> Result<Vec<(IOName, Tensor)>> {
        let mut ort_inputs = Vec::with_capacity(feed.len());
        for (name, input) in feed {
            ensure!(
                self.spec.input(name.as_str()).is_some(),
                "model has no input named `{name}`"
            );
            let value = tensor_to_ort_value(input)?;
            ort_inputs.push((name.0, SessionInputValue::from(value)));
        }

        let outputs = self.session.run(ort_inputs)?;
        let mut out_tensors = Vec::with_capacity(outputs.len());
        for (name, value) in outputs.iter() {
            let tensor = ort_value_to_tensor(&value)
                .with_context(|| format!("failed to read output `{name}`"))?;
            out_tensors.push((IOName(name.to_string()), tensor));
        }

        Ok(out_tensors)
    }
}

fn build_model_spec(session: &Session) -> Result<ModelSpec> {
    let inputs = session
        .inputs
        .iter()
        .map(|input| tensor_spec_from_value_type(&input.name, &input.input_type))
        .collect::<Result<Vec<_>>>()?;

    let outputs = session
        .outputs
        .iter()
        .map(|output| tensor_spec_from_value_type(&output.name, &output.output_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(ModelSpec { inputs, outputs })
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but onnxfeed-backend-ort was built without the `cuda` feature")
    }
}

fn tensor_spec_from_value_type(name: &str, value_type: &ValueType) -> Result<TensorSpec> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor IO value type for `{name}`");
    };

    let dtype = ort_tensor_element_to_dtype(*ty)?;
    let dims = shape
        .iter()
        .map(|d| if *d < 0 { None } else { Some(*d as usize) })
        .collect::<Vec<_>>();

    Ok(TensorSpec {
        name: IOName(name.to_string()),
        dtype,
        dims,
    })
}

fn ort_tensor_element_to_dtype(ty: TensorElementType) -> Result<DType> {
    match ty {
        TensorElementType::Float32 => Ok(DType::F32),
        TensorElementType::Int64 => Ok(DType::I64),
        TensorElementType::Int32 => Ok(DType::I32),
        TensorElementType::Uint8 => Ok(DType::U8),
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

fn tensor_to_ort_value(tensor: Tensor) -> Result<DynValue> {
    let Tensor { desc, bytes } = tensor;
    ensure!(
        desc.device == Device::Cpu,
        "input tensors must be host-resident, got one on {}",
        desc.device
    );
    let shape: Vec<usize> = desc.shape.dims().to_vec();
    let expected_bytes = desc.shape.numel() * desc.dtype.byte_size();
    ensure!(
        bytes.len() == expected_bytes,
        "input byte size mismatch: got {}, expected {}",
        bytes.len(),
        expected_bytes
    );

    let value = match desc.dtype {
        DType::F32 => {
            let data = decode_le(&bytes, f32::from_le_bytes);
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::I64 => {
            let data = decode_le(&bytes, i64::from_le_bytes);
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::I32 => {
            let data = decode_le(&bytes, i32::from_le_bytes);
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::U8 => {
            let data = bytes.to_vec();
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
    };

    Ok(value)
}

fn ort_value_to_tensor(value: &ort::value::ValueRef<'_>) -> Result<Tensor> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        bail!("non-tensor outputs are not supported");
    };

    let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
    let out_shape = Shape::from_slice(&dims);

    match *ty {
        TensorElementType::Float32 => {
            let array = value.try_extract_array::<f32>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Ok(Tensor::from_cpu_bytes(
                DType::F32,
                out_shape,
                encode_le(slice, |v| v.to_le_bytes()),
            ))
        }
        TensorElementType::Int64 => {
            let array = value.try_extract_array::<i64>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Ok(Tensor::from_cpu_bytes(
                DType::I64,
                out_shape,
                encode_le(slice, |v| v.to_le_bytes()),
            ))
        }
        TensorElementType::Int32 => {
            let array = value.try_extract_array::<i32>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Ok(Tensor::from_cpu_bytes(
                DType::I32,
                out_shape,
                encode_le(slice, |v| v.to_le_bytes()),
            ))
        }
        TensorElementType::Uint8 => {
            let array = value.try_extract_array::<u8>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Ok(Tensor::from_cpu_bytes(
                DType::U8,
                out_shape,
                Bytes::copy_from_slice(slice),
            ))
        }
        _ => bail!("unsupported output tensor element type: {ty}"),
    }
}

fn decode_le<T, const N: usize>(bytes: &[u8], from: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|b| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(b);
            from(raw)
        })
        .collect()
}

fn encode_le<T: Copy, const N: usize>(slice: &[T], to: impl Fn(T) -> [u8; N]) -> Bytes {
    slice.iter().flat_map(|v| to(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le_helpers_round_trip() {
        let values = [1.5f32, -2.25, 0.0];
        let bytes = encode_le(&values, |v| v.to_le_bytes());
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode_le(&bytes, f32::from_le_bytes), values.to_vec());
    }

    #[test]
    fn device_tensor_input_is_rejected() {
        let mut tensor = Tensor::from_cpu_bytes(
            DType::F32,
            Shape::from_slice(&[1]),
            Bytes::from(vec![0u8; 4]),
        );
        tensor.desc.device = Device::Cuda { device_id: 0 };
        let err = tensor_to_ort_value(tensor).unwrap_err();
        assert!(err.to_string().contains("host-resident"));
    }

    #[test]
    fn input_size_mismatch_is_rejected() {
        let tensor = Tensor::from_cpu_bytes(
            DType::F32,
            Shape::from_slice(&[2, 2]),
            Bytes::from(vec![0u8; 8]),
        );
        let err = tensor_to_ort_value(tensor).unwrap_err();
        assert!(err.to_string().contains("byte size mismatch"));
    }
}
