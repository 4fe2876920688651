//! Script sources
//!
//! A `ScriptSource` hands the runner the scripts it should consider. Sources
//! are plain values passed into the `Migrator`, so the same repository of
//! files can be served to production and test runs with different filters.

use crate::errors::{MigrunError, Result};
use crate::script::MigrationScript;
use std::path::{Path, PathBuf};

/// Provider of migration scripts
pub trait ScriptSource {
    /// All visible scripts, in any order
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying repository cannot be read or a
    /// script cannot be parsed.
    fn scripts(&self) -> Result<Vec<MigrationScript>>;
}

impl<S: ScriptSource + ?Sized> ScriptSource for &S {
    fn scripts(&self) -> Result<Vec<MigrationScript>> {
        (**self).scripts()
    }
}

impl<S: ScriptSource + ?Sized> ScriptSource for Box<S> {
    fn scripts(&self) -> Result<Vec<MigrationScript>> {
        (**self).scripts()
    }
}

/// In-memory script repository
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    scripts: Vec<MigrationScript>,
}

impl MemorySource {
    pub fn new(scripts: Vec<MigrationScript>) -> Self {
        Self { scripts }
    }

    /// Build a source from `(file_name, contents)` pairs
    ///
    /// # Errors
    ///
    /// Returns `InvalidScript` for the first file that does not parse.
    pub fn from_files<'a, I>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let scripts = files
            .into_iter()
            .map(|(file_name, contents)| MigrationScript::parse(file_name, contents))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { scripts })
    }

    pub fn push(&mut self, script: MigrationScript) {
        self.scripts.push(script);
    }
}

impl ScriptSource for MemorySource {
    fn scripts(&self) -> Result<Vec<MigrationScript>> {
        Ok(self.scripts.clone())
    }
}

/// A directory of `*.sql` files, read each time scripts are requested
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ScriptSource for DirSource {
    fn scripts(&self) -> Result<Vec<MigrationScript>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| MigrunError::io(format!("read_dir {}", self.dir.display()), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| MigrunError::io(format!("read_dir {}", self.dir.display()), e))?
                .path();
            if path.is_file() && path.extension().map(|ext| ext == "sql").unwrap_or(false) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut scripts = Vec::with_capacity(paths.len());
        for path in paths {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| MigrunError::InvalidScript {
                    file: path.display().to_string(),
                    reason: "file name is not valid UTF-8".to_string(),
                })?;
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| MigrunError::io(format!("read {}", path.display()), e))?;
            scripts.push(MigrationScript::parse(file_name, &contents)?);
        }
        Ok(scripts)
    }
}

/// A source with some scripts hidden
///
/// Scripts for which `skip` returns true are invisible to the runner: they
/// are neither applied nor reported as pending.
pub struct Filtered<S, F> {
    inner: S,
    skip: F,
}

impl<S, F> ScriptSource for Filtered<S, F>
where
    S: ScriptSource,
    F: Fn(&MigrationScript) -> bool,
{
    fn scripts(&self) -> Result<Vec<MigrationScript>> {
        Ok(self
            .inner
            .scripts()?
            .into_iter()
            .filter(|s| !(self.skip)(s))
            .collect())
    }
}

/// Combinators for any `ScriptSource`
pub trait ScriptSourceExt: ScriptSource + Sized {
    /// Hide scripts matching `skip`
    fn skip_if<F>(self, skip: F) -> Filtered<Self, F>
    where
        F: Fn(&MigrationScript) -> bool,
    {
        Filtered { inner: self, skip }
    }
}

impl<S: ScriptSource> ScriptSourceExt for S {}

/// Predicate matching one exact file name, such as `2_init.sql`
pub fn skip_file_named(file_name: impl Into<String>) -> impl Fn(&MigrationScript) -> bool {
    let file_name = file_name.into();
    move |script| script.file_name == file_name
}

/// Predicate matching file names containing a fragment, such as `test_data`
pub fn skip_file_containing(fragment: impl Into<String>) -> impl Fn(&MigrationScript) -> bool {
    let fragment = fragment.into();
    move |script| script.file_name.contains(&fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemorySource {
        MemorySource::from_files([
            ("1_init.sql", "-- +goose Up\nSELECT 1;\n"),
            ("2_init.sql", "-- +goose Up\nSELECT 2;\n"),
            ("3_test_data_rows.sql", "-- +goose Up\nSELECT 3;\n"),
        ])
        .unwrap()
    }

    fn versions(scripts: Vec<MigrationScript>) -> Vec<i64> {
        scripts.into_iter().map(|s| s.version).collect()
    }

    #[test]
    fn test_skip_file_named_hides_exact_match_only() {
        let filtered = source().skip_if(skip_file_named("2_init.sql"));
        assert_eq!(versions(filtered.scripts().unwrap()), vec![1, 3]);
    }

    #[test]
    fn test_skip_file_containing_hides_seed_scripts() {
        let filtered = source().skip_if(skip_file_containing("test_data"));
        assert_eq!(versions(filtered.scripts().unwrap()), vec![1, 2]);
    }

    #[test]
    fn test_filters_compose() {
        let filtered = source()
            .skip_if(skip_file_containing("test_data"))
            .skip_if(skip_file_named("1_init.sql"));
        assert_eq!(versions(filtered.scripts().unwrap()), vec![2]);
    }

    #[test]
    fn test_from_files_reports_bad_file() {
        let err = MemorySource::from_files([("oops.sql", "-- +goose Up\n")]).unwrap_err();
        assert!(matches!(err, MigrunError::InvalidScript { file, .. } if file == "oops.sql"));
    }

    #[test]
    fn test_dir_source_reads_only_sql_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2_second.sql"), "-- +goose Up\nSELECT 2;\n").unwrap();
        std::fs::write(dir.path().join("1_first.sql"), "-- +goose Up\nSELECT 1;\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "not a script").unwrap();

        let scripts = DirSource::new(dir.path()).scripts().unwrap();
        assert_eq!(versions(scripts), vec![1, 2]);
    }

    #[test]
    fn test_dir_source_on_plain_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("1_first.sql");
        std::fs::write(&file, "-- +goose Up\nSELECT 1;\n").unwrap();

        let err = DirSource::new(&file).scripts().unwrap_err();
        assert!(matches!(err, MigrunError::Io { op, .. } if op.starts_with("read_dir")));
    }

    #[test]
    fn test_dir_source_skips_subdirectories_named_like_scripts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("3_nested.sql")).unwrap();
        std::fs::write(dir.path().join("1_first.sql"), "-- +goose Up\nSELECT 1;\n").unwrap();

        let scripts = DirSource::new(dir.path()).scripts().unwrap();
        assert_eq!(versions(scripts), vec![1]);
    }

    #[test]
    fn test_dir_source_missing_dir_is_io_error() {
        let err = DirSource::new("/definitely/not/here").scripts().unwrap_err();
        assert!(matches!(err, MigrunError::Io { .. }));
    }
}
