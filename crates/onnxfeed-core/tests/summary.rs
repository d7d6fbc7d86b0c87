use bytes::Bytes;
use onnxfeed_core::{
    render_json, summarize, DType, IOName, OutputSummary, Shape, Tensor, DEFAULT_SAMPLE_LIMIT,
};
use serde_json::{json, Value};

fn f32_tensor(values: &[f32], dims: &[usize]) -> Tensor {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    Tensor::from_cpu_bytes(DType::F32, Shape::from_slice(dims), Bytes::from(bytes))
}

#[test]
fn sample_is_truncated_to_limit() {
    let values: Vec<f32> = (0..40).map(|i| i as f32).collect();
    let out = vec![(IOName("logits".into()), f32_tensor(&values, &[1, 40]))];

    let summaries = summarize(&out, DEFAULT_SAMPLE_LIMIT);
    assert_eq!(summaries.len(), 1);
    let s = &summaries[0];
    assert_eq!(s.name, "logits");
    assert_eq!(s.dtype, "float32");
    assert_eq!(s.dims, vec![1, 40]);
    assert_eq!(s.size, 40);
    assert_eq!(s.sample.len(), 16);
    assert_eq!(s.sample[15], json!(15.0));
}

#[test]
fn short_outputs_are_shown_whole() {
    let out = vec![(IOName("y".into()), f32_tensor(&[0.25, 0.75], &[2]))];
    let s = &summarize(&out, 16)[0];
    assert_eq!(s.sample, vec![json!(0.25), json!(0.75)]);
}

#[test]
fn integer_outputs_stay_integers_and_nan_is_null() {
    let ints: Vec<u8> = [3i64, -4].iter().flat_map(|v| v.to_le_bytes()).collect();
    let labels = Tensor::from_cpu_bytes(DType::I64, Shape::from_slice(&[2]), Bytes::from(ints));
    let s = OutputSummary::from_tensor(&IOName("labels".into()), &labels, 16);
    assert_eq!(s.dtype, "int64");
    assert_eq!(s.sample, vec![json!(3), json!(-4)]);

    let odd = f32_tensor(&[f32::NAN, 1.0], &[2]);
    let s = OutputSummary::from_tensor(&IOName("odd".into()), &odd, 16);
    assert_eq!(s.sample[0], Value::Null);
}

#[test]
fn rendered_json_lists_every_output() {
    let out = vec![
        (IOName("a".into()), f32_tensor(&[1.0], &[1])),
        (IOName("b".into()), f32_tensor(&[2.0, 3.0], &[1, 2])),
    ];
    let text = render_json(&summarize(&out, 1)).unwrap();
    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        parsed,
        json!([
            { "name": "a", "dtype": "float32", "dims": [1], "size": 1, "sample": [1.0] },
            { "name": "b", "dtype": "float32", "dims": [1, 2], "size": 2, "sample": [2.0] },
        ])
    );
}
