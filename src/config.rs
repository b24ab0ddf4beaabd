//! Config handling

use std::fmt;

use tracing::log::LevelFilter;
use tracing::{info, warn};

use crate::cli::{BackendKind, GeneratorOptions};
use crate::compose::{CaptionOptions, FontAsset};
use crate::constants::{DEFAULT_NEGATIVE_PROMPT, DEFAULT_PROMPT, HF_INFERENCE_API_BASE, HF_ROUTER_API_BASE};
use crate::fetch::{ApiShape, FileSource, HostedModel, ImageFetcher, TextToImage};
use crate::generator::{MemeGenerator, MemeSettings};
use crate::provision::{ProvisionOutcome, ensure_font};

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("ureq", LevelFilter::Warn);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Configuration that can't be turned into a working generator.
#[derive(Debug)]
pub enum ConfigError {
    /// A hosted backend was picked without a token
    MissingToken,
    /// The `file` backend was picked without an image
    MissingSourceImage,
    /// The source image couldn't be read
    SourceImage(std::io::Error),
    /// The API base isn't a URL
    InvalidApiBase(url::ParseError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "HF_TOKEN is required for hosted backends"),
            Self::MissingSourceImage => {
                write!(f, "--source-image is required for the file backend")
            }
            Self::SourceImage(err) => write!(f, "Failed to read source image: {err}"),
            Self::InvalidApiBase(err) => write!(f, "Invalid API base URL: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl GeneratorOptions {
    /// Builds the configured backend.
    pub fn build_backend(&self) -> Result<Box<dyn TextToImage>, ConfigError> {
        let shape = match self.backend {
            BackendKind::File => {
                let path = self
                    .source_image
                    .as_deref()
                    .ok_or(ConfigError::MissingSourceImage)?;
                let source = FileSource::open(path).map_err(ConfigError::SourceImage)?;
                return Ok(Box::new(source));
            }
            BackendKind::HfInference => ApiShape::RawInference,
            BackendKind::HfRouter => ApiShape::Router,
        };

        let token = self
            .hf_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let base = self.api_base.as_deref().unwrap_or(match shape {
            ApiShape::RawInference => HF_INFERENCE_API_BASE,
            ApiShape::Router => HF_ROUTER_API_BASE,
        });
        let model = HostedModel::new(reqwest::Client::new(), base, Some(token), shape)
            .map_err(ConfigError::InvalidApiBase)?;
        info!("Using {} backend at {}", model.name(), base);
        Ok(Box::new(model))
    }

    /// Provisions and loads the caption font; any failure means the built-in one.
    ///
    /// Blocks on the download, call it off the async runtime.
    pub fn load_font(&self) -> Option<FontAsset> {
        if !self.skip_font_download {
            match ensure_font(&self.font_path, &self.font_url) {
                Ok(ProvisionOutcome::Downloaded(bytes)) => {
                    info!("Font downloaded ({} bytes)", bytes);
                }
                Ok(ProvisionOutcome::AlreadyPresent) => {}
                Err(err) => warn!("{}, captions will use the built-in font", err),
            }
        }
        FontAsset::resolve(&self.font_path)
    }

    /// Prompt, model and caption settings.
    pub fn settings(&self) -> MemeSettings {
        MemeSettings {
            prompt: DEFAULT_PROMPT.to_string(),
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
            model: self.model.clone(),
            resize: (self.resize > 0).then_some(self.resize),
            caption: CaptionOptions {
                enhance: !self.no_enhance,
                ..CaptionOptions::default()
            },
        }
    }

    /// Backend, font and settings wired together.
    pub fn build_generator(&self) -> Result<MemeGenerator, ConfigError> {
        let fetcher = ImageFetcher::from_boxed(self.build_backend()?);
        let font = self.load_font();
        Ok(MemeGenerator::new(fetcher, font, self.settings()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliOptions;
    use clap::Parser;

    fn options(args: &[&str]) -> GeneratorOptions {
        let mut argv = vec!["pandameme"];
        argv.extend_from_slice(args);
        CliOptions::try_parse_from(argv).expect("parse").generator
    }

    #[test]
    fn hosted_backend_needs_token() {
        let opts = options(&["--backend", "hf-inference", "--hf-token", " "]);
        assert!(matches!(
            opts.build_backend(),
            Err(ConfigError::MissingToken)
        ));
        let opts = options(&["--backend", "hf-inference", "--hf-token", "hf_abc"]);
        let backend = opts.build_backend().expect("backend");
        assert_eq!(backend.name(), "hf-inference");
    }

    #[test]
    fn file_backend_needs_image() {
        let opts = options(&["--backend", "file"]);
        assert!(matches!(
            opts.build_backend(),
            Err(ConfigError::MissingSourceImage)
        ));
    }

    #[test]
    fn bad_api_base_is_rejected() {
        let opts = options(&["--hf-token", "hf_abc", "--api-base", "::nope::"]);
        assert!(matches!(
            opts.build_backend(),
            Err(ConfigError::InvalidApiBase(_))
        ));
    }

    #[test]
    fn settings_follow_flags() {
        let settings = options(&["--no-enhance", "--resize", "0", "--model", "a/b"]).settings();
        assert!(!settings.caption.enhance);
        assert_eq!(settings.resize, None);
        assert_eq!(settings.model, "a/b");
        assert_eq!(options(&[]).settings().resize, Some(512));
    }

    #[test]
    fn missing_font_without_download_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let font_path = dir.path().join("font.otf");
        let font_arg = font_path.to_string_lossy().to_string();
        let opts = options(&["--skip-font-download", "--font-path", &font_arg]);
        assert!(opts.load_font().is_none());
    }
}
