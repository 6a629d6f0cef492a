use anyhow::{Result, anyhow};
use pictalk_core::{NewPicto, Parent, PictoFilter, StoreError, StoreResult, TreeStore};
use pictalk_types::models::Picto;
use rusqlite::{Connection, ErrorCode, Row};
use uuid::Uuid;

use crate::Database;
use crate::models::PictoRow;

const PICTO_COLUMNS: &str = "id, speech, meaning, folder, father_id, path, user_id, collection_id";

impl TreeStore for Database {
    fn create(&self, record: NewPicto) -> StoreResult<Picto> {
        let picto = record.into_picto(Uuid::new_v4());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pictos
                     (id, speech, meaning, folder, father_id, path, user_id, collection_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    picto.id.to_string(),
                    &picto.speech,
                    &picto.meaning,
                    picto.folder,
                    picto.father_id.map(|id| id.to_string()),
                    &picto.path,
                    picto.user_id.to_string(),
                    picto.collection_id.map(|id| id.to_string()),
                ],
            )?;
            Ok(())
        })
        .map_err(classify)?;
        Ok(picto)
    }

    fn find_one(&self, filter: &PictoFilter) -> StoreResult<Option<Picto>> {
        let rows = self
            .with_conn(|conn| select(conn, filter, Some(1)))
            .map_err(classify)?;
        rows.into_iter()
            .next()
            .map(PictoRow::into_picto)
            .transpose()
            .map_err(StoreError::Backend)
    }

    fn find_many(&self, filter: &PictoFilter) -> StoreResult<Vec<Picto>> {
        let rows = self
            .with_conn(|conn| select(conn, filter, None))
            .map_err(classify)?;
        rows.into_iter()
            .map(PictoRow::into_picto)
            .collect::<Result<Vec<_>>>()
            .map_err(StoreError::Backend)
    }

    fn update(&self, picto: &Picto) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE pictos SET speech = ?1, meaning = ?2, folder = ?3, father_id = ?4, path = ?5
                 WHERE id = ?6 AND user_id = ?7",
                rusqlite::params![
                    &picto.speech,
                    &picto.meaning,
                    picto.folder,
                    picto.father_id.map(|id| id.to_string()),
                    &picto.path,
                    picto.id.to_string(),
                    picto.user_id.to_string(),
                ],
            )?;
            Ok(affected)
        })
        .map_err(classify)
    }

    fn delete_one(&self, id: Uuid, user_id: Uuid) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM pictos WHERE id = ?1 AND user_id = ?2",
                (id.to_string(), user_id.to_string()),
            )?;
            Ok(affected)
        })
        .map_err(classify)
    }

    fn delete_many(&self, filter: &PictoFilter) -> StoreResult<usize> {
        let (clause, values) = where_clause(filter);
        self.with_conn(|conn| {
            let affected = conn.execute(
                &format!("DELETE FROM pictos WHERE {}", clause),
                rusqlite::params_from_iter(values.iter()),
            )?;
            Ok(affected)
        })
        .map_err(classify)
    }
}

impl PictoRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            speech: row.get(1)?,
            meaning: row.get(2)?,
            folder: row.get(3)?,
            father_id: row.get(4)?,
            path: row.get(5)?,
            user_id: row.get(6)?,
            collection_id: row.get(7)?,
        })
    }

    fn into_picto(self) -> Result<Picto> {
        let parse = |field: &str, value: &str| {
            value.parse::<Uuid>().map_err(|e| {
                anyhow!("Corrupt {} '{}' on picto '{}': {}", field, value, self.id, e)
            })
        };
        Ok(Picto {
            id: parse("id", &self.id)?,
            father_id: self.father_id.as_deref().map(|v| parse("father_id", v)).transpose()?,
            user_id: parse("user_id", &self.user_id)?,
            collection_id: self
                .collection_id
                .as_deref()
                .map(|v| parse("collection_id", v))
                .transpose()?,
            speech: self.speech,
            meaning: self.meaning,
            folder: self.folder,
            path: self.path,
        })
    }
}

/// Translate a filter into a WHERE clause with positional parameters.
/// The owner clause is always first.
fn where_clause(filter: &PictoFilter) -> (String, Vec<String>) {
    let mut clauses = vec!["user_id = ?1".to_string()];
    let mut values = vec![filter.user_id().to_string()];

    if let Some(id) = filter.id_filter() {
        values.push(id.to_string());
        clauses.push(format!("id = ?{}", values.len()));
    }
    match filter.parent_filter() {
        Parent::Any => {}
        Parent::Root => clauses.push("father_id IS NULL".to_string()),
        Parent::Of(father_id) => {
            values.push(father_id.to_string());
            clauses.push(format!("father_id = ?{}", values.len()));
        }
    }
    if let Some(collection_id) = filter.collection_filter() {
        values.push(collection_id.to_string());
        clauses.push(format!("collection_id = ?{}", values.len()));
    }

    (clauses.join(" AND "), values)
}

fn select(conn: &Connection, filter: &PictoFilter, limit: Option<u32>) -> Result<Vec<PictoRow>> {
    let (clause, values) = where_clause(filter);
    let mut sql = format!("SELECT {} FROM pictos WHERE {}", PICTO_COLUMNS, clause);
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(values.iter()), PictoRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn classify(err: anyhow::Error) -> StoreError {
    let code = err
        .downcast_ref::<rusqlite::Error>()
        .and_then(|e| e.sqlite_error_code());
    if code == Some(ErrorCode::ConstraintViolation) {
        StoreError::Constraint(err.to_string())
    } else {
        StoreError::Backend(err)
    }
}
