//! Fetch, resize, caption: the whole trip for one button press.

use std::sync::Arc;
use std::time::Instant;

use image::imageops::FilterType;
use tracing::{info, instrument};

use crate::compose::{CaptionOptions, ComposedImage, FontAsset, compose};
use crate::constants::{DEFAULT_MODEL, DEFAULT_NEGATIVE_PROMPT, DEFAULT_PROMPT, DEFAULT_RESIZE};
use crate::error::MemeError;
use crate::fetch::{GenerationRequest, ImageFetcher};

/// Longest caption we'll lay out.
pub const MAX_CAPTION_CHARS: usize = 200;

/// What to ask for and how to draw it.
#[derive(Clone, Debug)]
pub struct MemeSettings {
    /// Art-style prompt.
    pub prompt: String,
    /// What the model should avoid.
    pub negative_prompt: String,
    /// Hosted model identifier.
    pub model: String,
    /// Square size the generated image is scaled to, `None` keeps it as is.
    pub resize: Option<u32>,
    /// Compositor knobs.
    pub caption: CaptionOptions,
}

impl Default for MemeSettings {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            resize: Some(DEFAULT_RESIZE),
            caption: CaptionOptions::default(),
        }
    }
}

/// Owns the backend and the font for the lifetime of the process.
#[derive(Debug)]
pub struct MemeGenerator {
    fetcher: ImageFetcher,
    font: Option<Arc<FontAsset>>,
    settings: MemeSettings,
}

impl MemeGenerator {
    /// `font` is `None` when no font file could be loaded.
    pub fn new(fetcher: ImageFetcher, font: Option<FontAsset>, settings: MemeSettings) -> Self {
        Self {
            fetcher,
            font: font.map(Arc::new),
            settings,
        }
    }

    /// The configured model.
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &str {
        self.fetcher.backend_name()
    }

    /// True when an outline font was loaded.
    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// The request sent for `caption`.
    pub fn request_for(&self, caption: &str) -> GenerationRequest {
        GenerationRequest::new(caption)
            .with_model(self.settings.model.as_str())
            .with_prompts(
                self.settings.prompt.as_str(),
                self.settings.negative_prompt.as_str(),
            )
    }

    /// Produces the captioned image, or the reason it couldn't.
    #[instrument(skip_all, fields(backend = self.fetcher.backend_name()))]
    pub async fn generate(&self, caption: &str) -> Result<ComposedImage, MemeError> {
        if caption.is_empty() {
            return Err(MemeError::EmptyCaption);
        }
        let length = caption.chars().count();
        if length > MAX_CAPTION_CHARS {
            return Err(MemeError::CaptionTooLong(length));
        }

        let started = Instant::now();
        let request = self.request_for(caption);
        let raw = self.fetcher.fetch(&request).await?;
        info!(
            "Got {}x{} image from {} in {:?}",
            raw.width(),
            raw.height(),
            self.fetcher.backend_name(),
            started.elapsed()
        );

        let font = self.font.clone();
        let resize = self.settings.resize;
        let options = self.settings.caption;
        let caption = request.caption;
        let composed = tokio::task::spawn_blocking(move || {
            let raw = match resize {
                Some(size) if size > 0 => raw.resize_exact(size, size, FilterType::CatmullRom),
                _ => raw,
            };
            compose(&raw, &caption, font.as_deref(), &options)
        })
        .await?;

        info!(
            "Composed {}x{} meme in {:?}",
            composed.width(),
            composed.height(),
            started.elapsed()
        );
        Ok(composed)
    }
}
