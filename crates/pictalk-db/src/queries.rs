use crate::Database;
use crate::models::{OrphanRow, UserRow};
use anyhow::Result;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, salt) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, salt),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, password, salt, created_at FROM users WHERE id = ?1",
            )?;

            let row = stmt
                .query_row([id], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password: row.get(2)?,
                        salt: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    // -- Collections --

    pub fn create_collection(&self, id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collections (id, user_id) VALUES (?1, ?2)",
                (id, user_id),
            )?;
            Ok(())
        })
    }

    // -- Maintenance --

    /// Pictos whose father is missing within the owner's forest.
    ///
    /// Not owner-scoped: this feeds the background sweeper, never a request.
    pub fn find_orphans(&self) -> Result<Vec<OrphanRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.user_id
                 FROM pictos p
                 WHERE p.father_id IS NOT NULL
                   AND NOT EXISTS (
                       SELECT 1 FROM pictos f
                       WHERE f.id = p.father_id AND f.user_id = p.user_id
                   )",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(OrphanRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_are_found_by_id() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "hash", "salt").unwrap();

        let user = db.get_user_by_id("u1").unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.salt, "salt");
        assert!(db.get_user_by_id("u2").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "h", "s").unwrap();
        assert!(db.create_user("u2", "alice", "h", "s").is_err());
    }

    #[test]
    fn collections_belong_to_existing_users() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "h", "s").unwrap();
        db.create_collection("c1", "u1").unwrap();
        assert!(db.create_collection("c2", "ghost").is_err());
    }
}
