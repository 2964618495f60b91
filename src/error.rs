use std::path::PathBuf;

pub type DigestResult<T> = Result<T, DigestError>;

/// Input failures inside the pipeline. Never escapes a parser: each variant
/// is rendered into `ParseResult::error` at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON object at the top level, found {0}")]
    NotAnObject(&'static str),
}

impl DigestError {
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            DigestError::NotFound(path)
        } else {
            DigestError::Io { path, source }
        }
    }
}

/// Read a whole file once, mapping failures to `DigestError`.
pub fn read_input(path: &std::path::Path) -> DigestResult<String> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(source) => Err(DigestError::from_io(path, source)),
    }
}
