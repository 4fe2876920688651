//! Sample-table access over sqlx

use super::{Approach, NewSample, Sample, SampleAccess};
use crate::errors::query_sqlx;
use crate::pg::PgSession;
use migrun_core::Result;
use sqlx::Row;

const INSERT: &str =
    "INSERT INTO test.sample_table (name, description, int_example) VALUES ($1, $2, $3)";
const SELECT_ALL: &str = "SELECT id, name, description, int_example, created_at, updated_at, deleted_at
     FROM test.sample_table ORDER BY id";

fn insert(session: &mut PgSession, sample: &NewSample) -> Result<u64> {
    let (runtime, conn) = session.parts()?;
    let done = runtime
        .block_on(
            sqlx::query(INSERT)
                .bind(&sample.name)
                .bind(&sample.description)
                .bind(sample.int_example)
                .execute(&mut *conn),
        )
        .map_err(|e| query_sqlx("insert_sample", e))?;
    Ok(done.rows_affected())
}

/// Positional access
pub struct RawSamples<'a> {
    session: &'a mut PgSession,
}

impl<'a> RawSamples<'a> {
    pub fn new(session: &'a mut PgSession) -> Self {
        Self { session }
    }
}

impl SampleAccess for RawSamples<'_> {
    fn approach(&self) -> Approach {
        Approach::Raw
    }

    fn insert(&mut self, sample: &NewSample) -> Result<u64> {
        insert(self.session, sample)
    }

    fn insert_returning(&mut self, sample: &NewSample) -> Result<Sample> {
        let (runtime, conn) = self.session.parts()?;
        let sql = format!("{} RETURNING id, created_at, updated_at", INSERT);
        let row = runtime
            .block_on(
                sqlx::query(&sql)
                    .bind(&sample.name)
                    .bind(&sample.description)
                    .bind(sample.int_example)
                    .fetch_one(&mut *conn),
            )
            .map_err(|e| query_sqlx("insert_sample_returning", e))?;

        let decode = || -> std::result::Result<Sample, sqlx::Error> {
            Ok(Sample {
                id: row.try_get(0)?,
                name: sample.name.clone(),
                description: sample.description.clone(),
                int_example: sample.int_example,
                created_at: row.try_get(1)?,
                updated_at: row.try_get(2)?,
                deleted_at: None,
            })
        };
        decode().map_err(|e| query_sqlx("insert_sample_returning", e))
    }

    fn select_all(&mut self) -> Result<Vec<Sample>> {
        let (runtime, conn) = self.session.parts()?;
        let rows = runtime
            .block_on(sqlx::query(SELECT_ALL).fetch_all(&mut *conn))
            .map_err(|e| query_sqlx("select_samples", e))?;

        rows.iter()
            .map(|row| {
                Ok(Sample {
                    id: row.try_get(0)?,
                    name: row.try_get(1)?,
                    description: row.try_get(2)?,
                    int_example: row.try_get(3)?,
                    created_at: row.try_get(4)?,
                    updated_at: row.try_get(5)?,
                    deleted_at: row.try_get(6)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| query_sqlx("select_samples", e))
    }
}

/// `FromRow` mapping by column name
pub struct MappedSamples<'a> {
    session: &'a mut PgSession,
}

impl<'a> MappedSamples<'a> {
    pub fn new(session: &'a mut PgSession) -> Self {
        Self { session }
    }
}

impl SampleAccess for MappedSamples<'_> {
    fn approach(&self) -> Approach {
        Approach::Mapped
    }

    fn insert(&mut self, sample: &NewSample) -> Result<u64> {
        insert(self.session, sample)
    }

    fn insert_returning(&mut self, sample: &NewSample) -> Result<Sample> {
        let (runtime, conn) = self.session.parts()?;
        let sql = format!("{} RETURNING *", INSERT);
        runtime
            .block_on(
                sqlx::query_as::<_, Sample>(&sql)
                    .bind(&sample.name)
                    .bind(&sample.description)
                    .bind(sample.int_example)
                    .fetch_one(&mut *conn),
            )
            .map_err(|e| query_sqlx("insert_sample_returning", e))
    }

    fn select_all(&mut self) -> Result<Vec<Sample>> {
        let (runtime, conn) = self.session.parts()?;
        runtime
            .block_on(sqlx::query_as::<_, Sample>(SELECT_ALL).fetch_all(&mut *conn))
            .map_err(|e| query_sqlx("select_samples", e))
    }
}

/// Access to `test.sample_table` in the given style
pub fn access(session: &mut PgSession, approach: Approach) -> Box<dyn SampleAccess + '_> {
    match approach {
        Approach::Raw => Box::new(RawSamples::new(session)),
        Approach::Mapped => Box::new(MappedSamples::new(session)),
    }
}
