use serde::Serialize;
use serde_json::{Number, Value};

use crate::{DType, IOName, Tensor};

/// Leading elements shown per output unless configured otherwise.
pub const DEFAULT_SAMPLE_LIMIT: usize = 16;

/// Short preview of one output tensor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputSummary {
    pub name: String,
    pub dtype: String,
    pub dims: Vec<usize>,
    pub size: usize,
    pub sample: Vec<Value>,
}

impl OutputSummary {
    pub fn from_tensor(name: &IOName, tensor: &Tensor, sample_limit: usize) -> Self {
        Self {
            name: name.0.clone(),
            dtype: tensor.desc.dtype.to_string(),
            dims: tensor.desc.shape.dims().to_vec(),
            size: tensor.len(),
            sample: sample_values(tensor, sample_limit),
        }
    }
}

pub fn summarize(outputs: &[(IOName, Tensor)], sample_limit: usize) -> Vec<OutputSummary> {
    outputs
        .iter()
        .map(|(name, tensor)| OutputSummary::from_tensor(name, tensor, sample_limit))
        .collect()
}

pub fn render_json(summaries: &[OutputSummary]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summaries)
}

// Non-finite floats have no JSON form and come out as null.
fn sample_values(tensor: &Tensor, limit: usize) -> Vec<Value> {
    let dtype = tensor.desc.dtype;
    tensor
        .bytes
        .chunks_exact(dtype.byte_size())
        .take(limit)
        .map(|b| match dtype {
            DType::F32 => {
                let v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number)
            }
            DType::I32 => Value::from(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            DType::I64 => Value::from(i64::from_le_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ])),
            DType::U8 => Value::from(b[0]),
        })
        .collect()
}
