use std::time::Duration;

/// Failure of a single recognition call
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Recognizer IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recognizer exited with {status}: {stderr}")]
    Process { status: String, stderr: String },

    #[error("Recognizer did not finish within {0:?} and was killed")]
    Deadline(Duration),

    #[error("Unreadable recognizer output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("No OCR engine became free within {0:?}")]
    Saturated(Duration),

    #[error("Engine pool is closed")]
    Closed,

    #[error("Engine pool has no engines")]
    Empty,
}
