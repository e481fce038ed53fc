//! Field log reconciliation.
//!
//! An edit arrives as a [`LogDraft`] (new field values plus the complete
//! replacement species list) and two undifferentiated batches of files: new
//! site photos and new species photos. Reconciliation merges it into the
//! stored log without losing or duplicating photo URLs:
//!
//! - species are matched to stored entries by exact `scientificName`;
//!   matched entries keep their stored `photos` untouched;
//! - the **first** species in the edit that is not already stored receives
//!   the whole species-photo batch, and any later new species get none,
//!   because the multipart encoding does not say which species a file
//!   belongs to;
//! - new site photos are appended after the stored ones;
//! - `createdAt` and `status` are carried over, `updatedAt` moves forward.
//!
//! Creation is the simpler sibling: with nothing stored, every species in
//! the draft gets its own upload of the entire species-photo batch.

use std::collections::{HashMap, HashSet};

use futures_util::future::{try_join, try_join_all};

use crate::Result;
use crate::model::{FieldLog, LogDraft, PhotoFile, SpeciesObservation};
use crate::photos::{SITE_PHOTOS, species_namespace, upload_group};
use crate::traits::BlobUploader;
use crate::types::Timestamp;

/// Index of the draft species that receives newly uploaded species photos:
/// the first one whose scientific name is not already in `existing`.
pub fn new_species_target(existing: &FieldLog, draft: &LogDraft) -> Option<usize> {
    let known: HashSet<&str> = existing
        .collected_species
        .iter()
        .map(|s| s.scientific_name.as_str())
        .collect();

    draft
        .collected_species
        .iter()
        .position(|s| !known.contains(s.scientific_name.as_str()))
}

/// Merge an edit into a stored log, uploading the new files.
///
/// Nothing is written to any store here; the caller persists the returned
/// document only if every upload succeeded.
pub async fn apply_edit(
    existing: FieldLog,
    draft: LogDraft,
    site_files: &[PhotoFile],
    species_files: &[PhotoFile],
    uploader: &dyn BlobUploader,
    now: Timestamp,
) -> Result<FieldLog> {
    let target = new_species_target(&existing, &draft).filter(|_| !species_files.is_empty());

    let target_namespace = target.map(|i| species_namespace(&draft.collected_species[i].scientific_name));

    let species_upload = async {
        match &target_namespace {
            Some(namespace) => upload_group(uploader, namespace, species_files).await,
            None => Ok(Vec::new()),
        }
    };
    let site_upload = upload_group(uploader, SITE_PHOTOS, site_files);

    let (mut new_species_urls, new_site_urls) = try_join(species_upload, site_upload).await?;

    let FieldLog {
        mut site_photos,
        collected_species: stored_species,
        status,
        created_at,
        updated_at,
        mut extra,
    } = existing;

    let mut stored_photos: HashMap<String, Vec<String>> = HashMap::new();
    for species in stored_species {
        stored_photos
            .entry(species.scientific_name)
            .or_insert(species.photos);
    }

    let collected_species = draft
        .collected_species
        .into_iter()
        .enumerate()
        .map(|(index, species)| {
            let mut photos = stored_photos
                .get(&species.scientific_name)
                .cloned()
                .unwrap_or_default();
            if target == Some(index) {
                photos.append(&mut new_species_urls);
            }
            species.into_observation(photos)
        })
        .collect();

    site_photos.extend(new_site_urls);

    for (key, value) in draft.fields {
        extra.insert(key, value);
    }
    // A stored updatedAt that did not parse is replaced below.
    extra.remove("updatedAt");

    Ok(FieldLog {
        site_photos,
        collected_species,
        status,
        created_at,
        updated_at: Some(updated_at.map_or(now, |previous| previous.max(now))),
        extra,
    })
}

/// Build a brand-new log from a draft, uploading its files.
pub async fn build_new(
    draft: LogDraft,
    site_files: &[PhotoFile],
    species_files: &[PhotoFile],
    uploader: &dyn BlobUploader,
    now: Timestamp,
) -> Result<FieldLog> {
    let site_photos = upload_group(uploader, SITE_PHOTOS, site_files).await?;

    let species_uploads = draft.collected_species.iter().map(|species| {
        let namespace = species_namespace(&species.scientific_name);
        async move { upload_group(uploader, &namespace, species_files).await }
    });
    let species_photos = try_join_all(species_uploads).await?;

    let collected_species: Vec<SpeciesObservation> = draft
        .collected_species
        .into_iter()
        .zip(species_photos)
        .map(|(species, photos)| species.into_observation(photos))
        .collect();

    Ok(FieldLog {
        site_photos,
        collected_species,
        status: true,
        created_at: Some(now),
        updated_at: Some(now),
        extra: draft.fields,
    })
}
