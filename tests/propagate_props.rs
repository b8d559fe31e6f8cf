//! Property-based tests for cipher propagation and re-encrypting saves.

use proptest::prelude::*;
use tempfile::TempDir;
use wzsave::commit::{SaveRequest, propagate};
use wzsave::model::{DataUnit, Directory, Hierarchy, UnitKind};
use wzsave::profile::{FormatVersion, NoPrompt, ProfileId, ProfileSelection};

mod common;

use common::{bodies, coordinator, load, profile, write_archive};

/// A unit placed at `d{a}/e{b}`, where 0 means "stop at the parent".
type Placement = (usize, usize, Vec<u8>);

fn placements() -> impl Strategy<Value = Vec<Placement>> {
    prop::collection::vec(
        (0usize..4, 0usize..3, prop::collection::vec(any::<u8>(), 0..64)),
        1..12,
    )
}

fn builtin_id() -> impl Strategy<Value = ProfileId> {
    prop::sample::select(vec![ProfileId::Gms, ProfileId::Ems, ProfileId::Bms])
}

fn child<'a>(dir: &'a mut Directory, name: &str) -> &'a mut Directory {
    let existing = dir.directories().iter().position(|d| d.name() == name);
    match existing {
        Some(i) => &mut dir.directories_mut()[i],
        None => dir.add_directory(Directory::new(name)),
    }
}

fn build(id: ProfileId, units: &[Placement]) -> Hierarchy {
    let mut h = Hierarchy::new("Prop.wz", profile(id), FormatVersion::new(95));
    for (i, (a, b, body)) in units.iter().enumerate() {
        let mut dir = h.root_mut();
        if *a > 0 {
            dir = child(dir, &format!("d{}", a));
            if *b > 0 {
                dir = child(dir, &format!("e{}", b));
            }
        }
        dir.add_unit(DataUnit::new(format!("u{}.img", i), body.clone()));
    }
    h
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Changing the cipher marks every unit of a loaded archive changed.
    #[test]
    fn cipher_change_marks_all_units(
        units in placements(),
        from in builtin_id(),
        to in builtin_id(),
    ) {
        prop_assume!(from != to);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Prop.wz");
        write_archive(&path, &build(from, &units));

        let mut unit = load(&path, UnitKind::Hierarchy, &profile(from)).unwrap();
        let wzsave::ArchiveUnit::Hierarchy(h) = &mut unit else {
            panic!("Expected hierarchy");
        };
        prop_assert!(h.root().walk_units().all(|u| !u.changed));

        let marked = propagate(h.root_mut(), &profile(from), &profile(to));
        prop_assert_eq!(marked, units.len());
        prop_assert!(h.root().walk_units().all(|u| u.changed));
    }

    /// Keeping the cipher leaves every flag as it was.
    #[test]
    fn same_cipher_keeps_flags(
        units in placements(),
        id in builtin_id(),
        edited in prop::collection::vec(any::<bool>(), 12),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Prop.wz");
        write_archive(&path, &build(id, &units));

        let mut unit = load(&path, UnitKind::Hierarchy, &profile(id)).unwrap();
        let wzsave::ArchiveUnit::Hierarchy(h) = &mut unit else {
            panic!("Expected hierarchy");
        };
        for (u, edit) in h.root_mut().walk_units_mut().zip(&edited) {
            u.changed = *edit;
        }
        let before: Vec<bool> = h.root().walk_units().map(|u| u.changed).collect();

        prop_assert_eq!(propagate(h.root_mut(), &profile(id), &profile(id)), 0);
        let after: Vec<bool> = h.root().walk_units().map(|u| u.changed).collect();
        prop_assert_eq!(before, after);
    }

    /// A re-encrypting save keeps the tree and every body.
    #[test]
    fn reencrypting_save_preserves_content(
        units in placements(),
        from in builtin_id(),
        to in builtin_id(),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Prop.wz");
        write_archive(&path, &build(from, &units));

        let mut unit = load(&path, UnitKind::Hierarchy, &profile(from)).unwrap();
        let paths = unit.as_hierarchy().unwrap().root().unit_paths();
        let before = bodies(&unit).unwrap();

        let outcome = coordinator(NoPrompt)
            .save(SaveRequest::new(&mut unit, &path, ProfileSelection::from(to)));
        prop_assert!(outcome.is_committed(), "save failed: {:?}", outcome);

        let reloaded = load(&path, UnitKind::Hierarchy, &profile(to)).unwrap();
        prop_assert_eq!(reloaded.as_hierarchy().unwrap().root().unit_paths(), paths);
        prop_assert_eq!(bodies(&reloaded).unwrap(), before);
    }
}
