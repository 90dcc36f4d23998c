//! Persistence of assembled models.
//!
//! A model is written once to a fresh `.supermodel` file and read back
//! whole. Existing files are never overwritten.

pub mod codec;

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::OutputError;

/// File extension of persisted models.
pub const EXTENSION: &str = "supermodel";

fn check_extension(path: &Path) -> Result<(), OutputError> {
    if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
        Ok(())
    } else {
        Err(OutputError::UnsupportedExtension {
            path: path.to_path_buf(),
            expected: EXTENSION,
        })
    }
}

fn decode_error(err: std::io::Error) -> OutputError {
    match err.kind() {
        ErrorKind::InvalidData | ErrorKind::UnexpectedEof => OutputError::Corrupted {
            message: err.to_string(),
        },
        _ => OutputError::Io(err),
    }
}

/// Writes `value` to a new file at `path`.
///
/// The value is encoded in memory first, so a failed encoding leaves no
/// file behind; a failed write removes the partial file.
///
/// # Errors
/// Wrong extension, an existing destination, encoding or I/O failure.
pub fn write_new<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    check_extension(path)?;
    let entry = codec::encode(value).map_err(|e| OutputError::Encode { message: e.to_string() })?;

    create_with(path, |file| {
        codec::write_header(file)?;
        file.write_all(&entry)
    })?;
    tracing::debug!(path = %path.display(), bytes = entry.len(), "model written");
    Ok(())
}

/// Creates `path` (never an existing file) and fills it with `fill`.
fn create_with(path: &Path, fill: impl FnOnce(&mut File) -> io::Result<()>) -> Result<(), OutputError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            return Err(OutputError::AlreadyExists {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(err.into()),
    };
    if let Err(err) = fill(&mut file).and_then(|()| file.sync_all()) {
        drop(file);
        if let Err(remove_err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %remove_err, "partial file left behind");
        }
        return Err(err.into());
    }
    Ok(())
}

/// Reads a value written by [`write_new`].
///
/// # Errors
/// Wrong extension, I/O failure, or a corrupted file.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T, OutputError> {
    check_extension(path)?;
    let mut reader = BufReader::new(File::open(path)?);
    let version = codec::read_header(&mut reader).map_err(decode_error)?;
    if version != codec::CODEC_VERSION {
        return Err(OutputError::Corrupted {
            message: format!("unsupported file version {version}"),
        });
    }
    codec::decode(&mut reader).map_err(decode_error)
}
