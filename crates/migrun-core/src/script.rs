//! Migration script model and goose-format parser
//!
//! A script file is named `<version>_<name>.sql` and carries annotated
//! blocks:
//!
//! ```sql
//! -- +goose Up
//! CREATE TABLE t (id INTEGER);
//!
//! -- +goose Down
//! DROP TABLE t;
//! ```
//!
//! Only the Up block is ever executed. The Down block is kept so that a
//! parsed script is a faithful image of its file.

use crate::errors::{MigrunError, Result};
use sha2::{Digest, Sha256};

const ANNOTATION_PREFIX: &str = "-- +goose";

/// One versioned unit of schema change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub version: i64,
    pub name: String,
    pub file_name: String,
    pub up_sql: String,
    pub down_sql: String,
    /// Run the Up block outside a transaction (`-- +goose NO TRANSACTION`)
    pub no_transaction: bool,
    /// SHA-256 of the file contents, hex encoded
    pub checksum: String,
}

/// A persisted fact that one script has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub checksum: String,
    /// Unix seconds
    pub applied_at: i64,
}

#[derive(Clone, Copy, PartialEq)]
enum Block {
    Preamble,
    Up,
    Down,
}

impl MigrationScript {
    /// Parse a script from its file name and contents
    ///
    /// # Errors
    ///
    /// Returns `InvalidScript` if the file name has no positive numeric
    /// version prefix, if there is SQL before the first annotation, or if
    /// there is no Up block.
    pub fn parse(file_name: &str, contents: &str) -> Result<Self> {
        let (version, name) = parse_file_name(file_name)?;

        let mut up = String::new();
        let mut down = String::new();
        let mut seen_up = false;
        let mut no_transaction = false;
        let mut block = Block::Preamble;

        for line in contents.lines() {
            let trimmed = line.trim();
            if let Some(annotation) = trimmed.strip_prefix(ANNOTATION_PREFIX) {
                match annotation.trim().to_ascii_lowercase().as_str() {
                    "up" => {
                        if seen_up {
                            return Err(invalid(file_name, "more than one Up annotation"));
                        }
                        seen_up = true;
                        block = Block::Up;
                    }
                    "down" => block = Block::Down,
                    "statementbegin" | "statementend" => {}
                    "no transaction" => no_transaction = true,
                    other => {
                        return Err(invalid(
                            file_name,
                            &format!("unknown annotation '{}'", other),
                        ))
                    }
                }
                continue;
            }

            match block {
                Block::Preamble => {
                    if !trimmed.is_empty() && !trimmed.starts_with("--") {
                        return Err(invalid(file_name, "statements before the Up annotation"));
                    }
                }
                Block::Up => push_line(&mut up, line),
                Block::Down => push_line(&mut down, line),
            }
        }

        if !seen_up {
            return Err(invalid(file_name, "missing '-- +goose Up' annotation"));
        }

        Ok(Self {
            version,
            name,
            file_name: file_name.to_string(),
            up_sql: up.trim().to_string(),
            down_sql: down.trim().to_string(),
            no_transaction,
            checksum: compute_checksum(contents),
        })
    }
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}

fn invalid(file_name: &str, reason: &str) -> MigrunError {
    MigrunError::InvalidScript {
        file: file_name.to_string(),
        reason: reason.to_string(),
    }
}

/// Split `00002_add_int_example.sql` into `(2, "add_int_example")`
pub fn parse_file_name(file_name: &str) -> Result<(i64, String)> {
    let stem = file_name
        .strip_suffix(".sql")
        .ok_or_else(|| invalid(file_name, "expected a .sql extension"))?;
    let (prefix, name) = match stem.split_once('_') {
        Some((prefix, name)) => (prefix, name),
        None => (stem, ""),
    };

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(file_name, "expected a numeric version prefix"));
    }
    let version: i64 = prefix
        .parse()
        .map_err(|_| invalid(file_name, "version prefix out of range"))?;
    if version < 1 {
        return Err(invalid(file_name, "version must be positive"));
    }

    Ok((version, name.to_string()))
}

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
