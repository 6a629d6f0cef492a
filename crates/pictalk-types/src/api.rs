use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Pictos --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePictoRequest {
    pub speech: String,
    pub meaning: String,
    #[serde(default)]
    pub folder: bool,
    #[serde(default)]
    pub father_id: Option<Uuid>,
}

/// Full replacement of a picto's mutable fields. A `None` father moves the
/// picto to the root of its collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditPictoRequest {
    pub speech: String,
    pub meaning: String,
    #[serde(default)]
    pub folder: bool,
    #[serde(default)]
    pub father_id: Option<Uuid>,
}
