//! CLI parser
use clap::{Args, Parser, ValueEnum};
use std::num::NonZeroU16;
use std::path::PathBuf;

use crate::constants::{DEFAULT_FONT_PATH, DEFAULT_FONT_URL, DEFAULT_MODEL, DEFAULT_RESIZE};

/// Where generated images come from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum BackendKind {
    /// Raw POST to the hosted inference API.
    HfInference,
    /// The route the hosted SDK clients use.
    HfRouter,
    /// A local image file, for offline runs.
    File,
}

#[derive(Args, Clone, Debug)]
/// Options shared by everything that generates memes
pub struct GeneratorOptions {
    #[clap(long, value_enum, default_value = "hf-router", env = "PANDAMEME_BACKEND")]
    /// Image backend, defaults to `hf-router`.
    /// Env: PANDAMEME_BACKEND
    pub backend: BackendKind,

    #[clap(long, default_value = DEFAULT_MODEL, env = "PANDAMEME_MODEL")]
    /// Hosted model identifier.
    /// Env: PANDAMEME_MODEL
    pub model: String,

    #[clap(long, env = "PANDAMEME_API_BASE")]
    /// Override the models base URL of the hosted backend.
    /// Env: PANDAMEME_API_BASE
    pub api_base: Option<String>,

    #[clap(long, env = "HF_TOKEN", hide_env_values = true)]
    /// Bearer token for the hosted backends.
    /// Env: HF_TOKEN
    pub hf_token: Option<String>,

    #[clap(long, env = "PANDAMEME_SOURCE_IMAGE")]
    /// Image served by the `file` backend.
    /// Env: PANDAMEME_SOURCE_IMAGE
    pub source_image: Option<PathBuf>,

    #[clap(long, default_value = DEFAULT_FONT_PATH, env = "PANDAMEME_FONT_PATH")]
    /// Caption font file, downloaded on first run.
    /// Env: PANDAMEME_FONT_PATH
    pub font_path: PathBuf,

    #[clap(long, default_value = DEFAULT_FONT_URL, env = "PANDAMEME_FONT_URL")]
    /// Where to download the caption font from.
    /// Env: PANDAMEME_FONT_URL
    pub font_url: String,

    #[clap(long, env = "PANDAMEME_SKIP_FONT_DOWNLOAD")]
    /// Don't try to download a missing font.
    /// Env: PANDAMEME_SKIP_FONT_DOWNLOAD
    pub skip_font_download: bool,

    #[clap(long, env = "PANDAMEME_NO_ENHANCE")]
    /// Skip the contrast/brightness pass.
    /// Env: PANDAMEME_NO_ENHANCE
    pub no_enhance: bool,

    #[clap(long, default_value_t = DEFAULT_RESIZE, env = "PANDAMEME_RESIZE")]
    /// Scale generated images to this square size, `0` keeps the original.
    /// Env: PANDAMEME_RESIZE
    pub resize: u32,
}

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "PANDAMEME_DEBUG")]
    /// Enable debug logging. Env: PANDAMEME_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "PANDAMEME_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: PANDAMEME_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "PANDAMEME_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: PANDAMEME_LISTEN_ADDRESS
    pub listen_address: String,

    #[command(flatten)]
    /// Backend, font and caption options
    pub generator: GeneratorOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = CliOptions::try_parse_from(["pandameme"]).expect("parse");
        assert_eq!(cli.port.get(), 9000);
        assert_eq!(cli.generator.backend, BackendKind::HfRouter);
        assert_eq!(cli.generator.model, DEFAULT_MODEL);
        assert_eq!(cli.generator.resize, 512);
        assert_eq!(cli.generator.font_path, PathBuf::from("NotoSansTC-Bold.otf"));
    }

    #[test]
    fn backend_names() {
        let cli = CliOptions::try_parse_from([
            "pandameme",
            "--backend",
            "file",
            "--source-image",
            "panda.png",
            "--no-enhance",
            "--resize",
            "0",
        ])
        .expect("parse");
        assert_eq!(cli.generator.backend, BackendKind::File);
        assert_eq!(cli.generator.source_image, Some(PathBuf::from("panda.png")));
        assert!(cli.generator.no_enhance);
        assert_eq!(cli.generator.resize, 0);

        let cli = CliOptions::try_parse_from(["pandameme", "--backend", "hf-inference"])
            .expect("parse");
        assert_eq!(cli.generator.backend, BackendKind::HfInference);
    }
}
