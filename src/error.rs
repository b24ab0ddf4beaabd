//! Error handling

use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::IntoResponse;
use tracing::{error, info, warn};

use crate::fetch::FetchFailure;

/// Everything that can stop a meme from being produced.
#[derive(Debug)]
pub enum MemeError {
    /// Nothing to caption
    EmptyCaption,
    /// Caption longer than we're willing to lay out, with its length
    CaptionTooLong(usize),
    /// The image never arrived
    Fetch(FetchFailure),
    /// The composed image couldn't be encoded
    Encode(String),
    /// Something went wrong on our side
    Internal(String),
}

impl MemeError {
    /// Message suitable for showing to the person who clicked the button.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCaption => "Please enter some caption text first.".to_string(),
            Self::CaptionTooLong(len) => {
                format!("That caption is {len} characters long, please keep it shorter.")
            }
            Self::Fetch(FetchFailure::ModelLoading {
                retry_after_seconds,
            }) => format!(
                "The model is still warming up. Please try again in about {:.0} seconds.",
                retry_after_seconds.ceil()
            ),
            Self::Fetch(failure) => format!("Generation failed, please try again later. ({failure})"),
            Self::Encode(_) | Self::Internal(_) => {
                "Generation failed, please try again later.".to_string()
            }
        }
    }
}

impl std::fmt::Display for MemeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCaption => write!(f, "Caption is empty"),
            Self::CaptionTooLong(len) => write!(f, "Caption too long ({len} characters)"),
            Self::Fetch(failure) => write!(f, "{failure}"),
            Self::Encode(err) => write!(f, "Failed to encode image: {err}"),
            Self::Internal(err) => write!(f, "Internal error: {err}"),
        }
    }
}

impl std::error::Error for MemeError {}

impl From<FetchFailure> for MemeError {
    fn from(failure: FetchFailure) -> Self {
        MemeError::Fetch(failure)
    }
}

impl From<image::ImageError> for MemeError {
    fn from(err: image::ImageError) -> Self {
        MemeError::Encode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for MemeError {
    fn from(err: tokio::task::JoinError) -> Self {
        MemeError::Internal(err.to_string())
    }
}

impl IntoResponse for MemeError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            MemeError::EmptyCaption | MemeError::CaptionTooLong(_) => {
                info!("Bad request: {}", self);
                StatusCode::BAD_REQUEST
            }
            MemeError::Fetch(FetchFailure::ModelLoading { .. }) => {
                info!("{}", self);
                StatusCode::SERVICE_UNAVAILABLE
            }
            MemeError::Fetch(_) => {
                warn!("Upstream failure: {}", self);
                StatusCode::BAD_GATEWAY
            }
            MemeError::Encode(_) | MemeError::Internal(_) => {
                error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut response =
            axum::response::Response::new(axum::body::Body::from(self.user_message()));
        *response.status_mut() = status;
        if let MemeError::Fetch(FetchFailure::ModelLoading {
            retry_after_seconds,
        }) = self
            && let Ok(value) = HeaderValue::from_str(&format!("{:.0}", retry_after_seconds.ceil()))
        {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}
