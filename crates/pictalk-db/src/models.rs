/// Database row types — these map directly to SQLite rows.
/// Distinct from pictalk-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub salt: String,
    pub created_at: String,
}

pub struct PictoRow {
    pub id: String,
    pub speech: String,
    pub meaning: String,
    pub folder: bool,
    pub father_id: Option<String>,
    pub path: String,
    pub user_id: String,
    pub collection_id: Option<String>,
}

/// A picto whose father no longer exists for the same user.
pub struct OrphanRow {
    pub id: String,
    pub user_id: String,
}
