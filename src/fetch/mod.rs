//! Fetching generated images from a text-to-image backend.
//!
//! Every backend implements [`TextToImage`] and hands back raw image bytes;
//! [`ImageFetcher`] turns those into a decoded [`RawImage`]. Failure bodies from
//! the hosted API are sorted into [`FetchFailure`] variants by
//! [`classify_failure`] so callers can tell a cold start from a hard error.

mod hosted;
mod local;

pub use hosted::{ApiShape, HostedModel};
pub use local::FileSource;

use std::fmt;
use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::constants::{
    DEFAULT_MODEL, DEFAULT_NEGATIVE_PROMPT, DEFAULT_PROMPT, DEFAULT_RETRY_AFTER_SECONDS,
};

/// A decoded image straight from the backend.
pub type RawImage = image::DynamicImage;

/// Everything needed for one generation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GenerationRequest {
    /// Art-style prompt.
    pub prompt: String,
    /// What the model should avoid.
    pub negative_prompt: String,
    /// Hosted model identifier, eg `stabilityai/stable-diffusion-xl-base-1.0`.
    pub model: String,
    /// User caption, drawn later by the compositor.
    pub caption: String,
}

impl GenerationRequest {
    /// Builds a request with the default panda prompts and model.
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            caption: caption.into(),
        }
    }

    /// Swaps the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Swaps the prompt pair.
    pub fn with_prompts(
        mut self,
        prompt: impl Into<String>,
        negative_prompt: impl Into<String>,
    ) -> Self {
        self.prompt = prompt.into();
        self.negative_prompt = negative_prompt.into();
        self
    }
}

/// Why a fetch produced no image.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchFailure {
    /// The model is still cold-starting, try again after the hint.
    ModelLoading {
        /// Estimated wait reported by the backend.
        retry_after_seconds: f64,
    },
    /// The backend answered with a structured error.
    RemoteError {
        /// HTTP status of the response.
        status_code: u16,
        /// Raw response body.
        body: String,
    },
    /// The backend answered with something that wasn't structured data.
    UnknownError {
        /// HTTP status of the response.
        status_code: u16,
        /// Raw response text.
        raw_text: String,
    },
    /// The success payload wasn't a decodable image.
    DecodeError(String),
    /// No response at all, eg connection refused.
    Transport(String),
}

impl FetchFailure {
    /// True when calling again later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelLoading { .. })
    }

    /// The wait hint for retryable failures.
    pub fn retry_after_seconds(&self) -> Option<f64> {
        match self {
            Self::ModelLoading {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoading {
                retry_after_seconds,
            } => write!(
                f,
                "Model is still loading, retry in about {:.0} seconds",
                retry_after_seconds.ceil()
            ),
            Self::RemoteError { status_code, body } => {
                write!(f, "Inference API error {status_code}: {body}")
            }
            Self::UnknownError {
                status_code,
                raw_text,
            } => write!(f, "Unexpected inference API response {status_code}: {raw_text}"),
            Self::DecodeError(err) => write!(f, "Failed to decode generated image: {err}"),
            Self::Transport(err) => write!(f, "Request to inference API failed: {err}"),
        }
    }
}

impl std::error::Error for FetchFailure {}

/// Future returned by [`TextToImage::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchFailure>> + Send + 'a>>;

/// Something that can turn a prompt into image bytes.
pub trait TextToImage: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Makes exactly one attempt at generating an image.
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a>;
}

/// Wraps a backend and decodes what it returns.
pub struct ImageFetcher {
    backend: Box<dyn TextToImage>,
}

impl fmt::Debug for ImageFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFetcher")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl ImageFetcher {
    /// Wraps a backend.
    pub fn new(backend: impl TextToImage + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Wraps an already boxed backend, as built from configuration.
    pub fn from_boxed(backend: Box<dyn TextToImage>) -> Self {
        Self { backend }
    }

    /// Name of the wrapped backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// One attempt, no retries and no sleeping.
    #[instrument(skip_all, fields(backend = self.backend.name(), model = %request.model))]
    pub async fn fetch(&self, request: &GenerationRequest) -> Result<RawImage, FetchFailure> {
        let bytes = self.backend.generate(request).await.inspect_err(|failure| {
            warn!("Image generation failed: {}", failure);
        })?;
        debug!("Received {} bytes from backend", bytes.len());
        decode_image(&bytes)
    }
}

/// Decodes image bytes, guessing the format from the content.
pub fn decode_image(bytes: &[u8]) -> Result<RawImage, FetchFailure> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| FetchFailure::DecodeError(err.to_string()))?;
    reader.decode().map_err(|err| {
        debug!("Failed to decode image: {}", err);
        FetchFailure::DecodeError(err.to_string())
    })
}

/// Sorts a non-success response into a [`FetchFailure`].
///
/// A JSON object whose `error` mentions loading is a cold start; the wait comes
/// from `estimated_time`, or [`DEFAULT_RETRY_AFTER_SECONDS`] when that is
/// missing. Any other JSON object is a remote error, anything else is unknown.
pub fn classify_failure(status_code: u16, body: &[u8]) -> FetchFailure {
    let parsed = match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => {
            return FetchFailure::UnknownError {
                status_code,
                raw_text: String::from_utf8_lossy(body).into_owned(),
            };
        }
    };

    let is_loading = error_message(&parsed)
        .is_some_and(|message| message.to_ascii_lowercase().contains("loading"));
    if is_loading {
        let retry_after_seconds = parsed
            .get("estimated_time")
            .and_then(Value::as_f64)
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .unwrap_or(DEFAULT_RETRY_AFTER_SECONDS);
        return FetchFailure::ModelLoading {
            retry_after_seconds,
        };
    }

    FetchFailure::RemoteError {
        status_code,
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

/// `error` may be a string or a list of strings.
fn error_message(parsed: &Value) -> Option<String> {
    match parsed.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Array(messages) => Some(
            messages
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Backend that always fails the same way.
    pub(crate) struct FailingBackend(pub(crate) FetchFailure);

    impl TextToImage for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn generate<'a>(&'a self, _request: &'a GenerationRequest) -> GenerateFuture<'a> {
            let failure = self.0.clone();
            Box::pin(async move { Err(failure) })
        }
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([180, 180, 180, 128]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .expect("encode png");
        out
    }

    #[test]
    fn loading_envelope_uses_estimated_time() {
        let body = br#"{"error":"Model stabilityai/stable-diffusion-xl-base-1.0 is currently loading","estimated_time":15}"#;
        let failure = classify_failure(503, body);
        assert_eq!(
            failure,
            FetchFailure::ModelLoading {
                retry_after_seconds: 15.0
            }
        );
        assert!(failure.is_retryable());
        assert_eq!(failure.retry_after_seconds(), Some(15.0));
    }

    #[test]
    fn loading_envelope_without_estimate_defaults() {
        let body = br#"{"error":"Model is currently loading"}"#;
        assert_eq!(
            classify_failure(503, body),
            FetchFailure::ModelLoading {
                retry_after_seconds: 20.0
            }
        );
    }

    #[test]
    fn loading_in_error_list() {
        let body = br#"{"error":["Model too busy","Model is loading"],"estimated_time":3.5}"#;
        assert_eq!(classify_failure(503, body).retry_after_seconds(), Some(3.5));
    }

    #[test]
    fn structured_error_is_remote() {
        let body = br#"{"error":"Authorization header is correct, but the token seems invalid"}"#;
        match classify_failure(401, body) {
            FetchFailure::RemoteError { status_code, body } => {
                assert_eq!(status_code, 401);
                assert!(body.contains("token seems invalid"));
            }
            other => panic!("unexpected failure {other:?}"),
        }
        assert!(!classify_failure(401, body).is_retryable());
    }

    #[test]
    fn non_json_body_is_unknown() {
        let failure = classify_failure(500, b"Internal Server Error");
        assert_eq!(
            failure,
            FetchFailure::UnknownError {
                status_code: 500,
                raw_text: "Internal Server Error".to_string()
            }
        );
        // bare JSON scalars aren't an error envelope either
        assert!(matches!(
            classify_failure(502, b"502"),
            FetchFailure::UnknownError {
                status_code: 502,
                ..
            }
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"This is not an image."),
            Err(FetchFailure::DecodeError(_))
        ));
        assert!(matches!(decode_image(&[]), Err(FetchFailure::DecodeError(_))));
        let image = decode_image(&png_bytes(4, 3)).expect("decode png");
        assert_eq!((image.width(), image.height()), (4, 3));
    }

    #[test]
    fn request_defaults() {
        let request = GenerationRequest::new("hi").with_model("some/model");
        assert_eq!(request.prompt, DEFAULT_PROMPT);
        assert_eq!(request.negative_prompt, DEFAULT_NEGATIVE_PROMPT);
        assert_eq!(request.model, "some/model");
        assert_eq!(request.caption, "hi");
    }

    #[tokio::test]
    async fn fetcher_passes_failures_through() {
        let fetcher = ImageFetcher::new(FailingBackend(FetchFailure::ModelLoading {
            retry_after_seconds: 15.0,
        }));
        let result = fetcher.fetch(&GenerationRequest::new("hi")).await;
        assert_eq!(
            result.err(),
            Some(FetchFailure::ModelLoading {
                retry_after_seconds: 15.0
            })
        );
    }

    #[tokio::test]
    async fn fetcher_decodes_backend_bytes() {
        let fetcher = ImageFetcher::new(FileSource::from_bytes(png_bytes(8, 8)));
        let image = fetcher
            .fetch(&GenerationRequest::new("hi"))
            .await
            .expect("fetch");
        assert_eq!(image.width(), 8);

        let fetcher = ImageFetcher::new(FileSource::from_bytes(b"nope".to_vec()));
        assert!(matches!(
            fetcher.fetch(&GenerationRequest::new("hi")).await,
            Err(FetchFailure::DecodeError(_))
        ));
    }
}
