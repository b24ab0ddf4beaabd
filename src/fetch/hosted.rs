//! Hosted inference API backend.

use reqwest::header::ACCEPT;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::{FetchFailure, GenerateFuture, GenerationRequest, TextToImage, classify_failure};

/// Which flavour of the hosted API we're talking to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApiShape {
    /// Raw POST, cold starts come back as loading errors.
    RawInference,
    /// The route the SDK clients use; asks the server to wait for the model.
    Router,
}

/// Request body for POST `{base}/{model}`
#[derive(Serialize, Debug)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters<'a>,
}

#[derive(Serialize, Debug)]
struct InferenceParameters<'a> {
    negative_prompt: &'a str,
}

/// Text-to-image over HTTP, authenticated with a bearer token.
#[derive(Clone, Debug)]
pub struct HostedModel {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    shape: ApiShape,
}

impl HostedModel {
    /// `base_url` is the models root, eg `https://api-inference.huggingface.co/models`.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        token: Option<String>,
        shape: ApiShape,
    ) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token,
            shape,
        })
    }

    /// The call shape in use.
    pub fn shape(&self) -> ApiShape {
        self.shape
    }

    /// Full URL for a model identifier.
    pub fn endpoint(&self, model: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/{}", self.base_url, model.trim_matches('/')))
    }
}

impl TextToImage for HostedModel {
    fn name(&self) -> &str {
        match self.shape {
            ApiShape::RawInference => "hf-inference",
            ApiShape::Router => "hf-router",
        }
    }

    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(async move {
            let endpoint = self
                .endpoint(&request.model)
                .map_err(|err| FetchFailure::Transport(err.to_string()))?;
            let body = InferenceRequest {
                inputs: &request.prompt,
                parameters: InferenceParameters {
                    negative_prompt: &request.negative_prompt,
                },
            };

            let mut builder = self
                .client
                .post(endpoint.clone())
                .header(ACCEPT, "image/png")
                .json(&body);
            if let Some(token) = self.token.as_deref() {
                builder = builder.bearer_auth(token);
            }
            if self.shape == ApiShape::Router {
                builder = builder.header("x-wait-for-model", "true");
            }

            debug!("POST {}", endpoint);
            let response = builder
                .send()
                .await
                .map_err(|err| FetchFailure::Transport(err.to_string()))?;

            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|err| FetchFailure::Transport(err.to_string()))?;

            if !status.is_success() {
                warn!(
                    "Inference API returned {} ({} bytes) for {}",
                    status,
                    bytes.len(),
                    request.model
                );
                return Err(classify_failure(status.as_u16(), &bytes));
            }
            Ok(bytes.to_vec())
        })
    }
}
