//! Field log documents and incoming edits.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, InvalidInputError};
use crate::types::{RecordKey, Timestamp};

/// Top-level fields owned by the server. Values for these keys in an
/// incoming payload are dropped instead of overlaid.
const RESERVED_LOG_FIELDS: &[&str] = &[
    "id",
    "sitePhotos",
    "collectedSpecies",
    "status",
    "createdAt",
    "updatedAt",
];

/// Species fields owned by the server.
const RESERVED_SPECIES_FIELDS: &[&str] = &["scientificName", "photos"];

/// One recorded site visit, as stored.
///
/// Fields other than the ones modelled here (location, notes, weather, ...)
/// are kept verbatim in [`FieldLog::extra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLog {
    /// Site photo URLs, oldest first.
    #[serde(default)]
    pub site_photos: Vec<String>,

    #[serde(default)]
    pub collected_species: Vec<SpeciesObservation>,

    /// `true` while the log is visible, `false` once soft-deleted.
    #[serde(default)]
    pub status: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldLog {
    /// Decode a stored document.
    ///
    /// Stored values the typed fields cannot hold (a `createdAt` that is not
    /// an ISO-8601 string, a non-boolean `status`, a species without a
    /// string name) are moved into `extra` and written back unchanged. Such
    /// a log decodes with `created_at` unset and `status` false.
    pub fn from_value(mut value: Value) -> Result<Self, serde_json::Error> {
        let mut odd = Map::new();
        let mut odd_species = Vec::new();

        if let Value::Object(fields) = &mut value {
            set_aside(fields, &mut odd, "createdAt", is_timestamp);
            set_aside(fields, &mut odd, "updatedAt", is_timestamp);
            set_aside(fields, &mut odd, "status", Value::is_boolean);

            if let Some(Value::Array(items)) = fields.get_mut("collectedSpecies") {
                for (index, item) in items.iter_mut().enumerate() {
                    let Value::Object(item) = item else { continue };
                    let mut odd_item = Map::new();
                    set_aside(item, &mut odd_item, "scientificName", Value::is_string);
                    if !odd_item.is_empty() {
                        odd_species.push((index, odd_item));
                    }
                }
            }
        }

        let mut log: FieldLog = serde_json::from_value(value)?;
        log.extra.extend(odd);
        for (index, odd_item) in odd_species {
            if let Some(species) = log.collected_species.get_mut(index) {
                species.extra.extend(odd_item);
            }
        }
        Ok(log)
    }

    /// Encode for storage.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Find a species entry by its exact scientific name.
    pub fn species(&self, scientific_name: &str) -> Option<&SpeciesObservation> {
        self.collected_species
            .iter()
            .find(|s| s.scientific_name == scientific_name)
    }
}

/// One species found during a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesObservation {
    /// Identity key when matching edits against stored entries. Empty for
    /// stored entries that carry no usable name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scientific_name: String,

    /// Photo URLs owned by this observation, oldest first.
    #[serde(default)]
    pub photos: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A stored field log together with its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLogRecord {
    pub id: RecordKey,

    #[serde(flatten)]
    pub log: FieldLog,
}

/// Client-supplied field log contents for a create or an edit.
///
/// Built from the JSON `data` part of a request. Server-owned fields are
/// stripped; `collectedSpecies` is required.
#[derive(Debug, Clone, PartialEq)]
pub struct LogDraft {
    /// Replacement species list, in client order.
    pub collected_species: Vec<SpeciesDraft>,
    /// Remaining top-level fields, overlaid shallowly onto the stored log.
    pub fields: Map<String, Value>,
}

/// One species entry of a [`LogDraft`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesDraft {
    pub scientific_name: String,
    /// Descriptive fields other than the name and photos.
    pub fields: Map<String, Value>,
}

impl LogDraft {
    /// Parse the JSON text of a request's `data` field.
    pub fn from_json(data: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(data).map_err(|e| malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate and split a JSON object into a draft.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let Value::Object(mut fields) = value else {
            return Err(malformed("field log data must be a JSON object"));
        };

        let species = match fields.remove("collectedSpecies") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(malformed("collectedSpecies must be an array")),
            None => return Err(malformed("collectedSpecies is required")),
        };

        let collected_species = species
            .into_iter()
            .enumerate()
            .map(|(index, item)| SpeciesDraft::from_value(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        for key in RESERVED_LOG_FIELDS {
            fields.remove(*key);
        }

        Ok(Self {
            collected_species,
            fields,
        })
    }
}

impl SpeciesDraft {
    fn from_value(index: usize, value: Value) -> Result<Self, Error> {
        let Value::Object(mut fields) = value else {
            return Err(malformed(format!(
                "collectedSpecies[{}] must be a JSON object",
                index
            )));
        };

        let scientific_name = match fields.get("scientificName") {
            Some(Value::String(name)) => name.clone(),
            _ => {
                return Err(malformed(format!(
                    "collectedSpecies[{}].scientificName must be a string",
                    index
                )));
            }
        };

        for key in RESERVED_SPECIES_FIELDS {
            fields.remove(*key);
        }

        Ok(Self {
            scientific_name,
            fields,
        })
    }

    /// Build the stored observation from this draft and a photo list.
    pub fn into_observation(self, photos: Vec<String>) -> SpeciesObservation {
        SpeciesObservation {
            scientific_name: self.scientific_name,
            photos,
            extra: self.fields,
        }
    }
}

/// Move `fields[key]` into `odd` unless `usable` accepts it.
fn set_aside(
    fields: &mut Map<String, Value>,
    odd: &mut Map<String, Value>,
    key: &str,
    usable: impl Fn(&Value) -> bool,
) {
    if fields.get(key).is_some_and(|v| !usable(v)) {
        if let Some(value) = fields.remove(key) {
            odd.insert(key.to_string(), value);
        }
    }
}

fn is_timestamp(value: &Value) -> bool {
    value.is_null() || value.as_str().and_then(Timestamp::parse).is_some()
}

fn malformed(reason: impl Into<String>) -> Error {
    InvalidInputError::FieldLog {
        reason: reason.into(),
    }
    .into()
}
