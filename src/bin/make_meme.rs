//! Generate one captioned panda meme and write it to disk.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use pandameme::cli::GeneratorOptions;
use pandameme::config::setup_logging;
use pandameme::error::MemeError;
use std::fs;
use std::path::PathBuf;

/// Generate a smug panda meme from the command line.
///
/// Minimal UX:
///   make_meme "大家不要出聲 讓他一個人尷尬"
#[derive(Parser, Debug)]
#[command(name = "make_meme")]
#[command(about = "Generate a smug panda image and caption it")]
struct Args {
    /// Caption text drawn under the panda
    caption: String,

    /// Output file
    #[arg(long, short, default_value = "meme.png")]
    out: PathBuf,

    /// Overwrite the output file if it exists
    #[arg(long)]
    force: bool,

    /// Enable debug logging
    #[arg(long, env = "PANDAMEME_DEBUG")]
    debug: bool,

    #[command(flatten)]
    generator: GeneratorOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    if args.out.exists() && !args.force {
        return Err(anyhow!(
            "Output already exists: {} (use --force to overwrite)",
            args.out.display()
        ));
    }

    let options = args.generator.clone();
    let generator = tokio::task::spawn_blocking(move || options.build_generator())
        .await
        .context("Startup task failed")??;

    let composed = match generator.generate(&args.caption).await {
        Ok(composed) => composed,
        Err(MemeError::Fetch(failure)) if failure.is_retryable() => {
            return Err(anyhow!("{}", MemeError::Fetch(failure).user_message()));
        }
        Err(err) => return Err(err).context("Meme generation failed"),
    };

    let png = composed.to_png().context("Failed to encode PNG")?;
    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&args.out, &png)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    eprintln!(
        "Saved: {} ({}x{})",
        args.out.display(),
        composed.width(),
        composed.height()
    );
    Ok(())
}
