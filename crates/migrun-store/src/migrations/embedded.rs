//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!. Each dialect
//! has its own copy of the same logical steps.

use migrun_core::{MemorySource, Result};

/// File-name fragment marking seed-data scripts that only test runs want
pub const TEST_DATA_MARKER: &str = "test_data";

/// SQL dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

const SQLITE_FILES: &[(&str, &str)] = &[
    (
        "00001_create_sample_table.sql",
        include_str!("../../migrations/sqlite/00001_create_sample_table.sql"),
    ),
    (
        "00002_add_int_example.sql",
        include_str!("../../migrations/sqlite/00002_add_int_example.sql"),
    ),
    (
        "00003_test_data_samples.sql",
        include_str!("../../migrations/sqlite/00003_test_data_samples.sql"),
    ),
];

const POSTGRES_FILES: &[(&str, &str)] = &[
    (
        "00001_create_sample_table.sql",
        include_str!("../../migrations/postgres/00001_create_sample_table.sql"),
    ),
    (
        "00002_add_int_example.sql",
        include_str!("../../migrations/postgres/00002_add_int_example.sql"),
    ),
    (
        "00003_test_data_samples.sql",
        include_str!("../../migrations/postgres/00003_test_data_samples.sql"),
    ),
];

/// All embedded scripts for a dialect, seed-data scripts included
///
/// # Errors
///
/// Returns `InvalidScript` if an embedded file does not parse.
pub fn embedded_scripts(dialect: Dialect) -> Result<MemorySource> {
    let files = match dialect {
        Dialect::Sqlite => SQLITE_FILES,
        Dialect::Postgres => POSTGRES_FILES,
    };
    MemorySource::from_files(files.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrun_core::ScriptSource;

    #[test]
    fn test_both_dialects_parse_with_same_versions() {
        let sqlite = embedded_scripts(Dialect::Sqlite).unwrap().scripts().unwrap();
        let postgres = embedded_scripts(Dialect::Postgres).unwrap().scripts().unwrap();

        let versions = |s: &[migrun_core::MigrationScript]| -> Vec<(i64, String)> {
            s.iter().map(|m| (m.version, m.name.clone())).collect()
        };
        assert_eq!(versions(&sqlite), versions(&postgres));
        assert_eq!(sqlite.len(), 3);
    }

    #[test]
    fn test_only_seed_script_carries_test_data_marker() {
        let scripts = embedded_scripts(Dialect::Postgres).unwrap().scripts().unwrap();
        let marked: Vec<&str> = scripts
            .iter()
            .filter(|s| s.file_name.contains(TEST_DATA_MARKER))
            .map(|s| s.file_name.as_str())
            .collect();
        assert_eq!(marked, vec!["00003_test_data_samples.sql"]);
    }
}
