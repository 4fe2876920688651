//! Migration runner
//!
//! Compares the applied-migration records of a target database with the
//! scripts of a source and applies what is missing, one transaction per
//! script, in ascending version order.

use crate::errors::{MigrunError, Result};
use crate::script::{AppliedMigration, MigrationScript};
use crate::source::ScriptSource;
use migrun_core_types::schema::EVENT_OUT_OF_ORDER;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Name of the table holding applied-migration records
pub const VERSION_TABLE: &str = "schema_version";

/// A database the runner can bring up to date
///
/// Backends implement this for their connection handle.
pub trait MigrationTarget {
    /// Create the version table if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the table cannot be created.
    fn ensure_version_table(&mut self) -> Result<()>;

    /// All applied-migration records
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the records cannot be read.
    fn applied(&mut self) -> Result<Vec<AppliedMigration>>;

    /// Execute the script's Up block and record it, atomically
    ///
    /// Unless the script is marked `no_transaction`, a failure must leave
    /// neither the script's effects nor its record behind. The returned
    /// error's message is wrapped into `MigrunError::Migration` by the
    /// runner.
    ///
    /// # Errors
    ///
    /// Returns the backend error that stopped the script.
    fn apply(&mut self, script: &MigrationScript) -> Result<()>;
}

impl<T: MigrationTarget + ?Sized> MigrationTarget for &mut T {
    fn ensure_version_table(&mut self) -> Result<()> {
        (**self).ensure_version_table()
    }

    fn applied(&mut self) -> Result<Vec<AppliedMigration>> {
        (**self).applied()
    }

    fn apply(&mut self, script: &MigrationScript) -> Result<()> {
        (**self).apply(script)
    }
}

/// What `apply_pending` would do right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Unapplied scripts in ascending version order
    pub pending: Vec<MigrationScript>,
    /// Versions in `pending` that are lower than the newest applied version
    pub out_of_order: Vec<i64>,
}

/// State of one script (or orphaned record) as reported by `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScriptState {
    Applied { applied_at: i64, checksum_matches: bool },
    Pending,
    PendingOutOfOrder,
    /// A record exists but no visible script carries its version
    AppliedWithoutScript { applied_at: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptStatus {
    pub version: i64,
    pub name: String,
    #[serde(flatten)]
    pub state: ScriptState,
}

/// Brings a target up to date with a script source
pub struct Migrator<S> {
    source: S,
    allow_missing: bool,
}

impl<S: ScriptSource> Migrator<S> {
    /// New runner with the allow-missing policy on
    pub fn new(source: S) -> Self {
        Self {
            source,
            allow_missing: true,
        }
    }

    /// Choose how unapplied scripts older than the newest applied one are
    /// treated.
    ///
    /// When allowed (the default), such a script is applied anyway, after
    /// the newer scripts that are already in place. This supports scripts
    /// merged out of authoring order from parallel branches, but nothing
    /// checks that the late script does not depend on a newer one that has
    /// not run yet, or conflict with one that has. Every such application is
    /// logged at `warn` with `event = "out_of_order"`. When disallowed,
    /// `plan` and `apply_pending` fail with `MissingMigrations` before
    /// touching the database.
    pub fn allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }

    pub fn allows_missing(&self) -> bool {
        self.allow_missing
    }

    /// Visible scripts sorted by version
    ///
    /// # Errors
    ///
    /// Returns `DuplicateVersion` if two scripts share a version, or the
    /// source's own error.
    pub fn scripts(&self) -> Result<Vec<MigrationScript>> {
        let mut scripts = self.source.scripts()?;
        scripts.sort_by_key(|s| s.version);
        for pair in scripts.windows(2) {
            if pair[0].version == pair[1].version {
                return Err(MigrunError::DuplicateVersion {
                    version: pair[0].version,
                    first: pair[0].file_name.clone(),
                    second: pair[1].file_name.clone(),
                });
            }
        }
        Ok(scripts)
    }

    /// Work out which scripts are unapplied
    ///
    /// # Errors
    ///
    /// Returns `MissingMigrations` if out-of-order scripts exist and the
    /// allow-missing policy is off, plus any source or persistence error.
    pub fn plan<T: MigrationTarget + ?Sized>(&self, target: &mut T) -> Result<Plan> {
        let scripts = self.scripts()?;
        target.ensure_version_table()?;
        let applied = target.applied()?;

        let plan = compute_plan(scripts, &applied);
        if !self.allow_missing && !plan.out_of_order.is_empty() {
            return Err(MigrunError::MissingMigrations {
                versions: plan.out_of_order,
            });
        }
        Ok(plan)
    }

    /// Apply every unapplied script in ascending version order
    ///
    /// Stops at the first failing script. Scripts applied before it stay
    /// applied. Returns the number of scripts applied by this call.
    ///
    /// # Errors
    ///
    /// Returns `Migration` naming the failing script, or any error from
    /// `plan`.
    pub fn apply_pending<T: MigrationTarget + ?Sized>(&self, target: &mut T) -> Result<usize> {
        let start = Instant::now();
        crate::log_op_start!("apply_pending");

        let plan = match self.plan(target) {
            Ok(plan) => plan,
            Err(err) => {
                crate::log_op_error!(
                    "apply_pending",
                    &err,
                    duration_ms = start.elapsed().as_millis() as u64
                );
                return Err(err);
            }
        };

        let mut applied = 0usize;
        for script in &plan.pending {
            if plan.out_of_order.contains(&script.version) {
                tracing::warn!(
                    component = module_path!(),
                    op = "apply_migration",
                    event = EVENT_OUT_OF_ORDER,
                    version = script.version,
                    script = %script.file_name,
                    "applying migration older than the current version"
                );
            }

            if let Err(err) = apply_one(target, script) {
                crate::log_op_error!(
                    "apply_pending",
                    &err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    applied_len = applied as u64
                );
                return Err(err);
            }
            applied += 1;
        }

        crate::log_op_end!(
            "apply_pending",
            duration_ms = start.elapsed().as_millis() as u64,
            applied_len = applied as u64
        );
        Ok(applied)
    }

    /// Per-script report of applied and pending state
    ///
    /// Unlike `plan`, never fails because of out-of-order scripts.
    ///
    /// # Errors
    ///
    /// Returns source or persistence errors.
    pub fn status<T: MigrationTarget + ?Sized>(&self, target: &mut T) -> Result<Vec<ScriptStatus>> {
        let scripts = self.scripts()?;
        target.ensure_version_table()?;
        let applied = target.applied()?;
        let max_applied = applied.iter().map(|a| a.version).max();

        let records: HashMap<i64, &AppliedMigration> =
            applied.iter().map(|a| (a.version, a)).collect();
        let mut rows: BTreeMap<i64, ScriptStatus> = BTreeMap::new();

        for script in &scripts {
            let state = match records.get(&script.version) {
                Some(record) => ScriptState::Applied {
                    applied_at: record.applied_at,
                    checksum_matches: record.checksum == script.checksum,
                },
                None if max_applied.map_or(false, |max| script.version < max) => {
                    ScriptState::PendingOutOfOrder
                }
                None => ScriptState::Pending,
            };
            rows.insert(
                script.version,
                ScriptStatus {
                    version: script.version,
                    name: script.name.clone(),
                    state,
                },
            );
        }

        for record in &applied {
            rows.entry(record.version).or_insert_with(|| ScriptStatus {
                version: record.version,
                name: record.name.clone(),
                state: ScriptState::AppliedWithoutScript {
                    applied_at: record.applied_at,
                },
            });
        }

        Ok(rows.into_values().collect())
    }
}

fn compute_plan(scripts: Vec<MigrationScript>, applied: &[AppliedMigration]) -> Plan {
    let max_applied = applied.iter().map(|a| a.version).max();
    let pending: Vec<MigrationScript> = scripts
        .into_iter()
        .filter(|s| !applied.iter().any(|a| a.version == s.version))
        .collect();
    let out_of_order = pending
        .iter()
        .filter(|s| max_applied.map_or(false, |max| s.version < max))
        .map(|s| s.version)
        .collect();
    Plan {
        pending,
        out_of_order,
    }
}

fn apply_one<T: MigrationTarget + ?Sized>(target: &mut T, script: &MigrationScript) -> Result<()> {
    let start = Instant::now();
    crate::log_op_start!(
        "apply_migration",
        version = script.version,
        script = %script.file_name
    );

    target.apply(script).map_err(|err| {
        let reason = match err {
            MigrunError::Persistence { message, .. } | MigrunError::Query { message, .. } => {
                message
            }
            other => other.to_string(),
        };
        let err = MigrunError::Migration {
            version: script.version,
            name: script.name.clone(),
            reason,
        };
        crate::log_op_error!(
            "apply_migration",
            &err,
            duration_ms = start.elapsed().as_millis() as u64,
            version = script.version
        );
        err
    })?;

    crate::log_op_end!(
        "apply_migration",
        duration_ms = start.elapsed().as_millis() as u64,
        version = script.version
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    /// Target that records everything in memory and can be told to fail
    #[derive(Default)]
    struct FakeTarget {
        records: Vec<AppliedMigration>,
        executed: Vec<i64>,
        fail_on: Option<i64>,
    }

    impl MigrationTarget for FakeTarget {
        fn ensure_version_table(&mut self) -> Result<()> {
            Ok(())
        }

        fn applied(&mut self) -> Result<Vec<AppliedMigration>> {
            Ok(self.records.clone())
        }

        fn apply(&mut self, script: &MigrationScript) -> Result<()> {
            self.executed.push(script.version);
            if self.fail_on == Some(script.version) {
                return Err(MigrunError::Persistence {
                    op: "execute".to_string(),
                    message: "syntax error".to_string(),
                });
            }
            self.records.push(AppliedMigration {
                version: script.version,
                name: script.name.clone(),
                checksum: script.checksum.clone(),
                applied_at: 0,
            });
            Ok(())
        }
    }

    fn script(version: i64) -> MigrationScript {
        MigrationScript::parse(
            &format!("{}_step.sql", version),
            &format!("-- +goose Up\nSELECT {};\n", version),
        )
        .unwrap()
    }

    fn source(versions: &[i64]) -> MemorySource {
        MemorySource::new(versions.iter().map(|v| script(*v)).collect())
    }

    #[test]
    fn test_applies_in_ascending_order_regardless_of_source_order() {
        let mut target = FakeTarget::default();
        let applied = Migrator::new(source(&[3, 1, 2]))
            .apply_pending(&mut target)
            .unwrap();
        assert_eq!(applied, 3);
        assert_eq!(target.executed, vec![1, 2, 3]);
    }

    #[test]
    fn test_rerun_applies_nothing() {
        let mut target = FakeTarget::default();
        let migrator = Migrator::new(source(&[1, 2]));
        migrator.apply_pending(&mut target).unwrap();
        assert_eq!(migrator.apply_pending(&mut target).unwrap(), 0);
        assert_eq!(target.executed, vec![1, 2]);
    }

    #[test]
    fn test_failure_stops_run_and_names_script() {
        let mut target = FakeTarget {
            fail_on: Some(2),
            ..Default::default()
        };
        let err = Migrator::new(source(&[1, 2, 3]))
            .apply_pending(&mut target)
            .unwrap_err();

        assert_eq!(
            err,
            MigrunError::Migration {
                version: 2,
                name: "step".to_string(),
                reason: "syntax error".to_string(),
            }
        );
        assert_eq!(target.executed, vec![1, 2]);
        let recorded: Vec<i64> = target.records.iter().map(|r| r.version).collect();
        assert_eq!(recorded, vec![1]);
    }

    #[test]
    fn test_duplicate_versions_rejected_before_touching_target() {
        let mut target = FakeTarget::default();
        let mut scripts = source(&[1, 2]);
        scripts.push(
            MigrationScript::parse("2_other.sql", "-- +goose Up\nSELECT 22;\n").unwrap(),
        );

        let err = Migrator::new(scripts).apply_pending(&mut target).unwrap_err();
        assert!(matches!(err, MigrunError::DuplicateVersion { version: 2, .. }));
        assert!(target.executed.is_empty());
    }

    #[test]
    fn test_out_of_order_applied_when_allowed() {
        let mut target = FakeTarget::default();
        Migrator::new(source(&[1, 3])).apply_pending(&mut target).unwrap();

        let applied = Migrator::new(source(&[1, 2, 3, 4]))
            .apply_pending(&mut target)
            .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(target.executed, vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_out_of_order_rejected_when_disallowed() {
        let mut target = FakeTarget::default();
        Migrator::new(source(&[1, 3])).apply_pending(&mut target).unwrap();

        let err = Migrator::new(source(&[1, 2, 3, 4]))
            .allow_missing(false)
            .apply_pending(&mut target)
            .unwrap_err();
        assert_eq!(err, MigrunError::MissingMigrations { versions: vec![2] });
        assert_eq!(target.executed, vec![1, 3]);
    }

    #[test]
    fn test_plan_reports_out_of_order_versions() {
        let mut target = FakeTarget::default();
        Migrator::new(source(&[5])).apply_pending(&mut target).unwrap();

        let plan = Migrator::new(source(&[1, 2, 5, 6])).plan(&mut target).unwrap();
        let pending: Vec<i64> = plan.pending.iter().map(|s| s.version).collect();
        assert_eq!(pending, vec![1, 2, 6]);
        assert_eq!(plan.out_of_order, vec![1, 2]);
    }

    #[test]
    fn test_status_reports_every_state() {
        let mut target = FakeTarget::default();
        Migrator::new(source(&[1, 3, 9])).apply_pending(&mut target).unwrap();
        // Version 1 was edited after being applied
        target.records[0].checksum = "stale".to_string();

        let status = Migrator::new(source(&[1, 2, 3, 4])).status(&mut target).unwrap();
        let states: Vec<(i64, ScriptState)> =
            status.into_iter().map(|s| (s.version, s.state)).collect();

        assert_eq!(
            states,
            vec![
                (
                    1,
                    ScriptState::Applied {
                        applied_at: 0,
                        checksum_matches: false
                    }
                ),
                (2, ScriptState::PendingOutOfOrder),
                (
                    3,
                    ScriptState::Applied {
                        applied_at: 0,
                        checksum_matches: true
                    }
                ),
                (4, ScriptState::PendingOutOfOrder),
                (9, ScriptState::AppliedWithoutScript { applied_at: 0 }),
            ]
        );
    }
}
