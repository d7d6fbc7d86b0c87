//! Builds a validated input tensor from the three strings a user types:
//! a shape (`1,3,224,224`), the data (`[0.5, 1]` or `0.5, 1`) and a dtype tag.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde_json::Value;

use crate::{DType, FeedError, Shape, Tensor};

/// Largest element count an input tensor may have (1 GiB of 4-byte elements).
pub const MAX_INPUT_ELEMENTS: usize = 1 << 28;

/// Element encoding selectable for an input tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DTypeTag {
    Float32,
    Int32,
}

impl DTypeTag {
    pub fn dtype(self) -> DType {
        match self {
            DTypeTag::Float32 => DType::F32,
            DTypeTag::Int32 => DType::I32,
        }
    }
}

impl FromStr for DTypeTag {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "float32" => Ok(DTypeTag::Float32),
            "int32" => Ok(DTypeTag::Int32),
            other => Err(FeedError::UnsupportedDType {
                tag: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dtype().as_str())
    }
}

/// Fixed-width element buffer, one entry per tensor element.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedBuffer {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
}

impl TypedBuffer {
    pub fn from_values(tag: DTypeTag, values: &[f64]) -> Self {
        match tag {
            DTypeTag::Float32 => TypedBuffer::Float32(values.iter().map(|v| *v as f32).collect()),
            DTypeTag::Int32 => {
                TypedBuffer::Int32(values.iter().map(|v| wrap_to_i32(*v)).collect())
            }
        }
    }

    pub fn tag(&self) -> DTypeTag {
        match self {
            TypedBuffer::Float32(_) => DTypeTag::Float32,
            TypedBuffer::Int32(_) => DTypeTag::Int32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedBuffer::Float32(v) => v.len(),
            TypedBuffer::Int32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            TypedBuffer::Float32(v) => v.get(index).map(|x| f64::from(*x)),
            TypedBuffer::Int32(v) => v.get(index).map(|x| f64::from(*x)),
        }
    }

    /// Little-endian element bytes, the layout backends expect.
    pub fn to_le_bytes(&self) -> Bytes {
        match self {
            TypedBuffer::Float32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            TypedBuffer::Int32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

/// A validated shape paired with its materialized buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct InputFeed {
    pub shape: Shape,
    pub buffer: TypedBuffer,
}

impl InputFeed {
    pub fn into_tensor(self) -> Tensor {
        let dtype = self.buffer.tag().dtype();
        Tensor::from_cpu_bytes(dtype, self.shape, self.buffer.to_le_bytes())
    }
}

/// Parses a comma-separated dimension list. Blank input means "no shape".
pub fn parse_shape(text: &str) -> Result<Option<Shape>, FeedError> {
    let parts: Vec<&str> = split_entries(text).collect();
    if parts.is_empty() {
        return Ok(None);
    }

    let dims = parts
        .into_iter()
        .map(|part| {
            parse_number(part)
                .filter(|n| *n > 0.0 && n.fract() == 0.0 && *n <= usize::MAX as f64)
                .map(|n| n as usize)
                .ok_or_else(|| FeedError::InvalidShape {
                    entry: part.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Shape::from_slice(&dims)))
}

/// Parses tensor contents given either as a JSON array or as a
/// comma-separated list. Blank input yields an empty vector.
///
/// Both forms are held to the same rule: every element must be a finite number.
pub fn parse_flat_data(text: &str) -> Result<Vec<f64>, FeedError> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
        return items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_f64()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| FeedError::InvalidData {
                        index,
                        value: item.to_string(),
                    })
            })
            .collect();
    }

    split_entries(text)
        .enumerate()
        .map(|(index, part)| {
            parse_number(part).ok_or_else(|| FeedError::InvalidData {
                index,
                value: part.to_string(),
            })
        })
        .collect()
}

/// Materializes `values` under the encoding named by `tag`.
pub fn build_typed_buffer(tag: &str, values: &[f64]) -> Result<TypedBuffer, FeedError> {
    let tag = tag.parse::<DTypeTag>()?;
    Ok(TypedBuffer::from_values(tag, values))
}

/// Runs the whole pipeline: shape, data, length check (or zero fill), buffer.
pub fn assemble_input(
    shape_text: &str,
    data_text: &str,
    dtype: &str,
) -> Result<InputFeed, FeedError> {
    let shape = parse_shape(shape_text)?.ok_or(FeedError::MissingShape)?;
    let data = parse_flat_data(data_text)?;

    let expected = shape.checked_numel().ok_or_else(|| FeedError::InvalidShape {
        entry: format!("{shape} (element count overflows)"),
    })?;
    if expected > MAX_INPUT_ELEMENTS {
        return Err(FeedError::InvalidShape {
            entry: format!("{shape} ({expected} elements, limit is {MAX_INPUT_ELEMENTS})"),
        });
    }

    let values = if data.is_empty() {
        zeros(expected).ok_or_else(|| FeedError::InvalidShape {
            entry: format!("{shape} (cannot allocate {expected} elements)"),
        })?
    } else if data.len() != expected {
        return Err(FeedError::ShapeMismatch {
            supplied: data.len(),
            expected,
        });
    } else {
        data
    };

    let buffer = build_typed_buffer(dtype, &values)?;
    Ok(InputFeed { shape, buffer })
}

fn zeros(len: usize) -> Option<Vec<f64>> {
    let mut values = Vec::new();
    values.try_reserve_exact(len).ok()?;
    values.resize(len, 0.0);
    Some(values)
}

fn split_entries(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Truncates toward zero, then wraps modulo 2^32 into the signed range.
fn wrap_to_i32(v: f64) -> i32 {
    if !v.is_finite() {
        return 0;
    }
    const TWO_32: f64 = 4_294_967_296.0;
    let wrapped = v.trunc().rem_euclid(TWO_32);
    if wrapped >= TWO_32 / 2.0 {
        (wrapped - TWO_32) as i32
    } else {
        wrapped as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_matches_int32_array_conversion() {
        assert_eq!(wrap_to_i32(1.7), 1);
        assert_eq!(wrap_to_i32(-1.7), -1);
        assert_eq!(wrap_to_i32(2_147_483_648.0), i32::MIN);
        assert_eq!(wrap_to_i32(4_294_967_297.0), 1);
        assert_eq!(wrap_to_i32(f64::NAN), 0);
    }

    #[test]
    fn zeros_fills_requested_length() {
        assert_eq!(zeros(3), Some(vec![0.0; 3]));
        assert_eq!(zeros(usize::MAX), None);
    }

    #[test]
    fn split_skips_blank_entries() {
        let parts: Vec<&str> = split_entries(" 1, ,2,,").collect();
        assert_eq!(parts, vec!["1", "2"]);
    }

    #[test]
    fn dtype_tag_display_round_trips() {
        for tag in [DTypeTag::Float32, DTypeTag::Int32] {
            assert_eq!(tag.to_string().parse::<DTypeTag>(), Ok(tag));
        }
    }
}
