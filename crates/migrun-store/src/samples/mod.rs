//! Sample-table data access
//!
//! The same four operations over `sample_table`, written two ways:
//!
//! - [`Approach::Raw`] reads columns by position and builds `Sample` by hand
//! - [`Approach::Mapped`] maps columns by name into `Sample`
//!
//! Each backend module provides both. Every driver failure is returned as
//! `MigrunError::Query`.

use chrono::{DateTime, Utc};
use migrun_core::{MigrunError, Result};
use serde::Serialize;
use std::fmt;

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

/// One row of `sample_table`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Sample {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub int_example: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Columns a caller supplies on insert; the rest are defaulted by the table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewSample {
    pub name: String,
    pub description: Option<String>,
    pub int_example: Option<i32>,
}

impl NewSample {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_int_example(mut self, value: i32) -> Self {
        self.int_example = Some(value);
        self
    }
}

/// How rows are moved between the driver and `Sample`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    Raw,
    Mapped,
}

impl Approach {
    pub const ALL: [Approach; 2] = [Approach::Raw, Approach::Mapped];

    pub fn label(&self) -> &'static str {
        match self {
            Approach::Raw => "raw",
            Approach::Mapped => "mapped",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The demonstrated operations on `sample_table`
pub trait SampleAccess {
    fn approach(&self) -> Approach;

    /// Insert one row, returning the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `Query` if the driver rejects the statement.
    fn insert(&mut self, sample: &NewSample) -> Result<u64>;

    /// Insert one row and read it back in the same statement
    ///
    /// # Errors
    ///
    /// Returns `Query` if the driver rejects the statement.
    fn insert_returning(&mut self, sample: &NewSample) -> Result<Sample>;

    /// Every row, ordered by id
    ///
    /// # Errors
    ///
    /// Returns `Query` if the driver rejects the statement or a row does not
    /// decode.
    fn select_all(&mut self) -> Result<Vec<Sample>>;
}

impl<A: SampleAccess + ?Sized> SampleAccess for Box<A> {
    fn approach(&self) -> Approach {
        (**self).approach()
    }

    fn insert(&mut self, sample: &NewSample) -> Result<u64> {
        (**self).insert(sample)
    }

    fn insert_returning(&mut self, sample: &NewSample) -> Result<Sample> {
        (**self).insert_returning(sample)
    }

    fn select_all(&mut self) -> Result<Vec<Sample>> {
        (**self).select_all()
    }
}

/// Render rows as `Samples from <label>:` followed by indented JSON
///
/// # Errors
///
/// Returns `Query` if the rows cannot be serialized.
pub fn render_samples<T: Serialize + ?Sized>(label: &str, rows: &T) -> Result<String> {
    let json = serde_json::to_string_pretty(rows).map_err(|e| MigrunError::Query {
        op: "render_samples".to_string(),
        message: e.to_string(),
    })?;
    Ok(format!("Samples from {}:\n{}", label, json))
}
