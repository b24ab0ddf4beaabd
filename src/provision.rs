//! One-time download of the caption font.
//!
//! Runs before serving. An existing file is never touched, and a failed
//! download leaves nothing behind so the next start tries again.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// What [`ensure_font`] did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProvisionOutcome {
    /// The file was already on disk.
    AlreadyPresent,
    /// The file was fetched, with its size in bytes.
    Downloaded(u64),
}

/// Why the font couldn't be fetched.
#[derive(Debug)]
pub enum ProvisionError {
    /// The GET failed or returned an error status.
    Request(ureq::Error),
    /// Writing the file failed.
    Io(io::Error),
}

impl std::fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(err) => write!(f, "Font download failed: {err}"),
            Self::Io(err) => write!(f, "Failed to store font: {err}"),
        }
    }
}

impl std::error::Error for ProvisionError {}

impl From<ureq::Error> for ProvisionError {
    fn from(err: ureq::Error) -> Self {
        ProvisionError::Request(err)
    }
}

impl From<io::Error> for ProvisionError {
    fn from(err: io::Error) -> Self {
        ProvisionError::Io(err)
    }
}

/// Makes sure `path` exists, downloading it from `url` if it doesn't.
pub fn ensure_font(path: &Path, url: &str) -> Result<ProvisionOutcome, ProvisionError> {
    if path.exists() {
        debug!("Font already present at {}", path.display());
        return Ok(ProvisionOutcome::AlreadyPresent);
    }

    info!("Downloading caption font from {}", url);
    let response = ureq::get(url).call()?;
    let partial = partial_path(path);
    let written = match write_body(response.into_body(), &partial) {
        Ok(written) => written,
        Err(err) => {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
    };
    fs::rename(&partial, path)?;
    info!("Saved {} ({} bytes)", path.display(), written);
    Ok(ProvisionOutcome::Downloaded(written))
}

fn write_body(body: ureq::Body, target: &Path) -> Result<u64, ProvisionError> {
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(target)?;
    let written = io::copy(&mut body.into_reader(), &mut file)?;
    file.sync_all()?;
    Ok(written)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
