use bytes::Bytes;

#[derive(Clone, Debug)]
pub enum ModelArtifact {
    OnnxPath(std::path::PathBuf),
    /// Model file contents already read into memory.
    OnnxBytes(Bytes),
}

impl ModelArtifact {
    /// Short human-readable origin, used in log lines.
    pub fn describe(&self) -> String {
        match self {
            ModelArtifact::OnnxPath(path) => path.display().to_string(),
            ModelArtifact::OnnxBytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}
