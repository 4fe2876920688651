//! Property tests for the runner's ordering and idempotence guarantees

#![allow(clippy::unwrap_used, clippy::expect_used)]

use migrun_core::{
    AppliedMigration, MemorySource, MigrationScript, MigrationTarget, Migrator, MigrunError,
    Result,
};
use proptest::prelude::*;

#[derive(Default)]
struct RecordingTarget {
    records: Vec<AppliedMigration>,
    executed: Vec<i64>,
}

impl MigrationTarget for RecordingTarget {
    fn ensure_version_table(&mut self) -> Result<()> {
        Ok(())
    }

    fn applied(&mut self) -> Result<Vec<AppliedMigration>> {
        Ok(self.records.clone())
    }

    fn apply(&mut self, script: &MigrationScript) -> Result<()> {
        self.executed.push(script.version);
        self.records.push(AppliedMigration {
            version: script.version,
            name: script.name.clone(),
            checksum: script.checksum.clone(),
            applied_at: 0,
        });
        Ok(())
    }
}

fn scripts_for(versions: &[i64]) -> Vec<MigrationScript> {
    versions
        .iter()
        .map(|v| {
            MigrationScript::parse(
                &format!("{}_generated.sql", v),
                &format!("-- +goose Up\nSELECT {};\n", v),
            )
            .unwrap()
        })
        .collect()
}

proptest! {
    #[test]
    fn applies_any_ordering_ascending_and_completely(
        versions in proptest::collection::btree_set(1i64..10_000, 0..20)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    ) {
        let mut target = RecordingTarget::default();
        let migrator = Migrator::new(MemorySource::new(scripts_for(&versions)));

        let applied = migrator.apply_pending(&mut target).unwrap();
        prop_assert_eq!(applied, versions.len());

        let mut expected = versions.clone();
        expected.sort_unstable();
        prop_assert_eq!(&target.executed, &expected);

        let mut recorded: Vec<i64> = target.records.iter().map(|r| r.version).collect();
        recorded.sort_unstable();
        prop_assert_eq!(recorded, expected);

        prop_assert_eq!(migrator.apply_pending(&mut target).unwrap(), 0);
    }

    #[test]
    fn late_scripts_are_applied_ascending_after_newer_ones(
        split in 1usize..8,
        total in 8usize..16,
    ) {
        // Apply only every other script first, then the full set.
        let all: Vec<i64> = (1..=total as i64).collect();
        let first: Vec<i64> = all.iter().copied().filter(|v| v % 2 == 0 || *v as usize > split).collect();

        let mut target = RecordingTarget::default();
        Migrator::new(MemorySource::new(scripts_for(&first)))
            .apply_pending(&mut target)
            .unwrap();
        target.executed.clear();

        Migrator::new(MemorySource::new(scripts_for(&all)))
            .apply_pending(&mut target)
            .unwrap();

        let mut sorted = target.executed.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&target.executed, &sorted);

        let strict = Migrator::new(MemorySource::new(scripts_for(&all)))
            .allow_missing(false)
            .apply_pending(&mut target);
        prop_assert_eq!(strict, Ok(0));
    }
}

#[test]
fn strict_mode_lists_every_missing_version() {
    let mut target = RecordingTarget::default();
    Migrator::new(MemorySource::new(scripts_for(&[10])))
        .apply_pending(&mut target)
        .unwrap();

    let err = Migrator::new(MemorySource::new(scripts_for(&[1, 5, 10, 11])))
        .allow_missing(false)
        .apply_pending(&mut target)
        .unwrap_err();

    assert_eq!(err, MigrunError::MissingMigrations { versions: vec![1, 5] });
}
