use thiserror::Error;
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("channel {index} out of range (scope has {count} channels)")]
    ChannelOutOfRange { index: usize, count: usize },
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScopeError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ScopeError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for ScopeError {
    fn from(value: image::ImageError) -> Self {
        ScopeError::Plot(value.to_string())
    }
}
