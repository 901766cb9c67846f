use thiserror::Error;

#[derive(Debug, Error)]
pub enum SluiceError {
    #[error("concurrency limit must be at least 1, got {0}")]
    InvalidLimit(usize),
}
