use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated user as handed to the picto layer.
/// Credentials stay in the database row and never travel with this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub user_id: Uuid,
}

/// A pictogram record. `path` is the blob key of its image.
///
/// Root pictos have no `father_id` and are scoped by `collection_id` instead.
/// Only folders may have children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picto {
    pub id: Uuid,
    pub speech: String,
    pub meaning: String,
    pub folder: bool,
    pub father_id: Option<Uuid>,
    pub path: String,
    pub user_id: Uuid,
    pub collection_id: Option<Uuid>,
}

/// List projection of a picto: same shape minus `id` and `userId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictoView {
    pub speech: String,
    pub meaning: String,
    pub folder: bool,
    pub father_id: Option<Uuid>,
    pub path: String,
    pub collection_id: Option<Uuid>,
}

impl From<Picto> for PictoView {
    fn from(p: Picto) -> Self {
        Self {
            speech: p.speech,
            meaning: p.meaning,
            folder: p.folder,
            father_id: p.father_id,
            path: p.path,
            collection_id: p.collection_id,
        }
    }
}
