//! Property-based tests for directory entries.
//!
//! Random sequences of writes and removals must leave the original-case map matching a
//! plain model map, and the lowercase index consistent with the last write per folded name.

use directory_entry::{DirectoryEntry, DirectoryModification};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Set(String, Vec<String>),
    Remove(String),
}

/// Small name pool so that case collisions and repeated writes are frequent.
fn name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "cn", "CN", "Cn", "mail", "Mail", "MAIL", "uid", "member", "Équipe", "ÉQUIPE",
    ])
    .prop_map(str::to_string)
}

fn values_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9@.]{0,8}", 0..4)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (name_strategy(), values_strategy()).prop_map(|(name, values)| Op::Set(name, values)),
        1 => name_strategy().prop_map(Op::Remove),
    ]
}

/// Attributes that carry at least one value; an LDAP server cannot hold the others.
fn non_empty(entry: &DirectoryEntry) -> HashMap<String, Vec<String>> {
    entry
        .attributes(false)
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| (name.clone(), values.clone()))
        .collect()
}

proptest! {
    #[test]
    fn dn_is_returned_verbatim(dn in ".*") {
        let entry = DirectoryEntry::with_dn(dn.clone());
        prop_assert_eq!(entry.dn(), dn.as_str());
    }

    #[test]
    fn set_then_get_returns_values(name in name_strategy(), values in values_strategy()) {
        let mut entry = DirectoryEntry::with_dn("dc=example");
        entry.set_attribute(name.clone(), values.clone());

        prop_assert!(entry.has_attribute(&name, false));
        prop_assert_eq!(entry.attribute(&name, false), Some(values.as_slice()));
        prop_assert_eq!(entry.attribute(&name.to_uppercase(), true), Some(values.as_slice()));
    }

    #[test]
    fn remove_clears_both_lookups(name in name_strategy(), values in values_strategy()) {
        let mut entry = DirectoryEntry::with_dn("dc=example");
        entry.set_attribute(name.clone(), values);
        entry.remove_attribute(&name);

        prop_assert!(!entry.has_attribute(&name, false));
        prop_assert!(!entry.has_attribute(&name, true));
    }

    #[test]
    fn operations_match_model(ops in prop::collection::vec(op_strategy(), 0..32)) {
        let mut entry = DirectoryEntry::with_dn("dc=example");
        let mut model: HashMap<String, Vec<String>> = HashMap::new();
        let mut last_write: HashMap<String, Vec<String>> = HashMap::new();

        for op in &ops {
            match op {
                Op::Set(name, values) => {
                    entry.set_attribute(name.clone(), values.clone());
                    model.insert(name.clone(), values.clone());
                    last_write.insert(name.to_lowercase(), values.clone());
                }
                Op::Remove(name) => {
                    entry.remove_attribute(name);
                    model.remove(name);
                    last_write.remove(&name.to_lowercase());
                }
            }
        }

        prop_assert_eq!(entry.attributes(false), &model);
        prop_assert_eq!(entry.attributes(true), &last_write);
    }

    #[test]
    fn diff_reaches_target(
        source_ops in prop::collection::vec(op_strategy(), 0..16),
        target_ops in prop::collection::vec(op_strategy(), 0..16),
    ) {
        let build = |ops: &[Op]| {
            let mut entry = DirectoryEntry::with_dn("dc=example");
            for op in ops {
                match op {
                    Op::Set(name, values) => entry.set_attribute(name.clone(), values.clone()),
                    Op::Remove(name) => entry.remove_attribute(name),
                }
            }
            entry
        };
        let mut source = build(&source_ops);
        let target = build(&target_ops);

        let changes: Vec<DirectoryModification> = source.diff(&target);
        source.apply_all(&changes);
        prop_assert_eq!(non_empty(&source), non_empty(&target));

        // Within one folded name, deletions are submitted before replacements.
        for (index, change) in changes.iter().enumerate() {
            if let DirectoryModification::Delete { attribute, .. } = change {
                let folded = attribute.to_lowercase();
                prop_assert!(!changes[..index].iter().any(|earlier| {
                    matches!(earlier, DirectoryModification::Replace { .. })
                        && earlier.attribute().to_lowercase() == folded
                }), "replace submitted before delete for {}", folded);
            }
        }
    }
}
