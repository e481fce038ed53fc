//! Photo blob paths and grouped uploads.
//!
//! Every uploaded photo lands at `{namespace}/{unixMillis}-{sanitizedName}`.
//! Two uploads with the same sanitized name in the same millisecond share a
//! path and the later one wins.

use chrono::Utc;
use futures_util::future::try_join_all;
use tracing::{debug, instrument};

use crate::Result;
use crate::model::PhotoFile;
use crate::traits::BlobUploader;

/// Namespace for site photos.
pub const SITE_PHOTOS: &str = "site-photos";

/// Parent namespace for species photos.
pub const SPECIES_PHOTOS: &str = "species-photos";

/// Namespace segment used when a scientific name sanitizes to nothing.
const UNKNOWN_SPECIES: &str = "unknown";

/// Replace every character outside `[A-Za-z0-9.]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Namespace for one species' photos: `species-photos/{name}` with every
/// non-alphanumeric character replaced by `_`.
pub fn species_namespace(scientific_name: &str) -> String {
    let segment: String = scientific_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if segment.is_empty() {
        format!("{}/{}", SPECIES_PHOTOS, UNKNOWN_SPECIES)
    } else {
        format!("{}/{}", SPECIES_PHOTOS, segment)
    }
}

/// Blob path for one file.
pub fn blob_path(namespace: &str, timestamp_millis: i64, file_name: &str) -> String {
    format!(
        "{}/{}-{}",
        namespace,
        timestamp_millis,
        sanitize_file_name(file_name)
    )
}

/// Upload a group of files under one namespace, concurrently.
///
/// Returns one URL per file, in the order of `files`. The first failure
/// aborts the group.
#[instrument(skip(uploader, files), fields(count = files.len()))]
pub async fn upload_group(
    uploader: &dyn BlobUploader,
    namespace: &str,
    files: &[PhotoFile],
) -> Result<Vec<String>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let uploads = files.iter().map(|file| {
        let path = blob_path(namespace, Utc::now().timestamp_millis(), &file.file_name);
        async move {
            let url = uploader
                .upload(&path, &file.bytes, file.content_type.as_deref())
                .await?;
            debug!(%path, "Uploaded photo");
            Ok::<_, crate::Error>(url)
        }
    });

    try_join_all(uploads).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_file_name("IMG 0001.JPG"), "IMG_0001.JPG");
        assert_eq!(sanitize_file_name("trucha(1)-río.png"), "trucha_1__r_o.png");
    }

    #[test]
    fn species_namespace_replaces_dots_too() {
        assert_eq!(
            species_namespace("Salmo trutta"),
            "species-photos/Salmo_trutta"
        );
        assert_eq!(species_namespace("Oncorhynchus sp."), "species-photos/Oncorhynchus_sp_");
    }

    #[test]
    fn empty_species_name_falls_back_to_unknown() {
        assert_eq!(species_namespace(""), "species-photos/unknown");
    }

    #[test]
    fn blob_path_layout() {
        assert_eq!(
            blob_path(SITE_PHOTOS, 1714564800000, "lake view.jpg"),
            "site-photos/1714564800000-lake_view.jpg"
        );
    }
}
