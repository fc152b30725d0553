use crate::batch::BatchError;
use crate::feed::{DecodeError, FetchError};
use crate::render::RenderError;
use hyper::StatusCode;

/// Why a `/subscribe` request failed. Each variant ends the request.
#[derive(thiserror::Error, Debug)]
pub enum SubscribeError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("could not fetch feed: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not decode feed: {0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    MalformedLine(#[from] BatchError),
    #[error("{0}")]
    Render(#[from] RenderError),
}

impl SubscribeError {
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Response body sent to the caller. Fetch and decode details stay in the logs.
    pub fn body(&self) -> String {
        match self {
            SubscribeError::Fetch(_) | SubscribeError::Decode(_) => String::new(),
            _ => self.to_string(),
        }
    }

    /// Short label used to tag metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SubscribeError::PermissionDenied => "auth",
            SubscribeError::Fetch(_) => "fetch",
            SubscribeError::Decode(_) => "decode",
            SubscribeError::MalformedLine(_) => "parse",
            SubscribeError::Render(_) => "render",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not build feed client: {0}")]
    FeedClient(#[from] FetchError),
}
