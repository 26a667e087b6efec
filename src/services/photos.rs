use crate::models::Frame;
use crate::models::photo::{PhotoRecord, day_prefix, is_image_file_name};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{NaiveDate, NaiveDateTime};
use image::codecs::jpeg::JpegEncoder;
use std::fs::{self, File};
use std::io::BufWriter;
use thiserror::Error;

/// JPEG quality of saved photos.
pub const PHOTO_JPEG_QUALITY: u8 = 92;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Failed to create photos directory {path}: {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read photos directory {path}: {source}")]
    ReadDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: Utf8PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Frame has no pixel data")]
    EmptyFrame,
}

/// Create `directory` and its parents if missing.
pub fn ensure_directory(directory: &Utf8Path) -> Result<(), PhotoError> {
    fs::create_dir_all(directory).map_err(|source| PhotoError::CreateDirectory {
        path: directory.to_path_buf(),
        source,
    })
}

/// Encode `frame` as JPEG into `directory`, named after `taken_at`.
///
/// Blocking; run it off the presentation context.
pub fn save_photo(
    directory: &Utf8Path,
    frame: &Frame,
    taken_at: NaiveDateTime,
) -> Result<Utf8PathBuf, PhotoError> {
    ensure_directory(directory)?;

    let record = PhotoRecord::new(taken_at);
    let path = directory.join(&record.file_name);
    let image = frame.to_rgb_image().ok_or(PhotoError::EmptyFrame)?;

    let file = File::create(&path).map_err(|source| PhotoError::Write {
        path: path.clone(),
        source,
    })?;
    JpegEncoder::new_with_quality(BufWriter::new(file), PHOTO_JPEG_QUALITY)
        .encode_image(&image)
        .map_err(|source| PhotoError::Encode {
            path: path.clone(),
            source,
        })?;

    tracing::info!("Saved photo {}", path);
    Ok(path)
}

/// Image file names in `directory`, sorted lexicographically.
///
/// Sorted order is chronological for photos named by [`PhotoRecord`].
pub fn list_photos(directory: &Utf8Path) -> Result<Vec<String>, PhotoError> {
    let read_error = |source| PhotoError::ReadDirectory {
        path: directory.to_path_buf(),
        source,
    };

    let mut photos = Vec::new();
    for entry in fs::read_dir(directory).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!("Skipping non UTF-8 file name in {}", directory);
            continue;
        };
        if is_image_file_name(&name) && entry.path().is_file() {
            photos.push(name);
        }
    }

    photos.sort();
    Ok(photos)
}

/// Number of photos, or `None` if the directory does not exist.
pub fn count_photos(directory: &Utf8Path) -> Option<usize> {
    if !directory.is_dir() {
        return None;
    }
    match list_photos(directory) {
        Ok(photos) => Some(photos.len()),
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}

/// First photo whose name starts with `date`, if any.
pub fn find_photo_for_day(directory: &Utf8Path, date: NaiveDate) -> Option<String> {
    if !directory.is_dir() {
        return None;
    }
    let prefix = day_prefix(date);
    list_photos(directory)
        .ok()?
        .into_iter()
        .find(|name| name.starts_with(&prefix))
}
