//! Sample-table access over rusqlite

use super::{Approach, NewSample, Sample, SampleAccess};
use crate::db::SqliteSession;
use crate::errors::query_rusqlite;
use migrun_core::Result;
use rusqlite::{named_params, params, Row};

const SELECT_ALL: &str = "SELECT id, name, description, int_example, created_at, updated_at, deleted_at
     FROM sample_table ORDER BY id";

impl TryFrom<&Row<'_>> for Sample {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(Sample {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            int_example: row.get("int_example")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
        })
    }
}

/// Positional access
pub struct RawSamples<'a> {
    session: &'a SqliteSession,
}

impl<'a> RawSamples<'a> {
    pub fn new(session: &'a SqliteSession) -> Self {
        Self { session }
    }
}

impl SampleAccess for RawSamples<'_> {
    fn approach(&self) -> Approach {
        Approach::Raw
    }

    fn insert(&mut self, sample: &NewSample) -> Result<u64> {
        let affected = self
            .session
            .connection()
            .execute(
                "INSERT INTO sample_table (name, description, int_example) VALUES (?1, ?2, ?3)",
                params![sample.name, sample.description, sample.int_example],
            )
            .map_err(|e| query_rusqlite("insert_sample", e))?;
        Ok(affected as u64)
    }

    fn insert_returning(&mut self, sample: &NewSample) -> Result<Sample> {
        self.session
            .connection()
            .query_row(
                "INSERT INTO sample_table (name, description, int_example) VALUES (?1, ?2, ?3)
                 RETURNING id, created_at, updated_at",
                params![sample.name, sample.description, sample.int_example],
                |row| {
                    Ok(Sample {
                        id: row.get(0)?,
                        name: sample.name.clone(),
                        description: sample.description.clone(),
                        int_example: sample.int_example,
                        created_at: row.get(1)?,
                        updated_at: row.get(2)?,
                        deleted_at: None,
                    })
                },
            )
            .map_err(|e| query_rusqlite("insert_sample_returning", e))
    }

    fn select_all(&mut self) -> Result<Vec<Sample>> {
        let conn = self.session.connection();
        let mut stmt = conn
            .prepare(SELECT_ALL)
            .map_err(|e| query_rusqlite("select_samples", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Sample {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    int_example: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                    deleted_at: row.get(6)?,
                })
            })
            .map_err(|e| query_rusqlite("select_samples", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| query_rusqlite("select_samples", e))?;
        Ok(rows)
    }
}

/// Named-column access with cached statements
pub struct MappedSamples<'a> {
    session: &'a SqliteSession,
}

impl<'a> MappedSamples<'a> {
    pub fn new(session: &'a SqliteSession) -> Self {
        Self { session }
    }
}

impl SampleAccess for MappedSamples<'_> {
    fn approach(&self) -> Approach {
        Approach::Mapped
    }

    fn insert(&mut self, sample: &NewSample) -> Result<u64> {
        let mut stmt = self
            .session
            .connection()
            .prepare_cached(
                "INSERT INTO sample_table (name, description, int_example)
                 VALUES (:name, :description, :int_example)",
            )
            .map_err(|e| query_rusqlite("insert_sample", e))?;
        let affected = stmt
            .execute(named_params! {
                ":name": sample.name,
                ":description": sample.description,
                ":int_example": sample.int_example,
            })
            .map_err(|e| query_rusqlite("insert_sample", e))?;
        Ok(affected as u64)
    }

    fn insert_returning(&mut self, sample: &NewSample) -> Result<Sample> {
        let mut stmt = self
            .session
            .connection()
            .prepare_cached(
                "INSERT INTO sample_table (name, description, int_example)
                 VALUES (:name, :description, :int_example)
                 RETURNING *",
            )
            .map_err(|e| query_rusqlite("insert_sample_returning", e))?;
        stmt.query_row(
            named_params! {
                ":name": sample.name,
                ":description": sample.description,
                ":int_example": sample.int_example,
            },
            |row| Sample::try_from(row),
        )
        .map_err(|e| query_rusqlite("insert_sample_returning", e))
    }

    fn select_all(&mut self) -> Result<Vec<Sample>> {
        let mut stmt = self
            .session
            .connection()
            .prepare_cached(SELECT_ALL)
            .map_err(|e| query_rusqlite("select_samples", e))?;
        let rows = stmt
            .query_map([], |row| Sample::try_from(row))
            .map_err(|e| query_rusqlite("select_samples", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| query_rusqlite("select_samples", e))?;
        Ok(rows)
    }
}

/// Access to `sample_table` in the given style
pub fn access(session: &SqliteSession, approach: Approach) -> Box<dyn SampleAccess + '_> {
    match approach {
        Approach::Raw => Box::new(RawSamples::new(session)),
        Approach::Mapped => Box::new(MappedSamples::new(session)),
    }
}
