//! Property-based tests for the run lifecycle and core types.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::BTreeMap;

use proptest::prelude::*;

use doltrun::core::message::{names_run, CommitMessageBuilder, DefaultMessage, ExtraParamsMessage};
use doltrun::core::params::{ParamValue, RunParameters};
use doltrun::core::types::{BranchName, RunId};
use doltrun::engine::{run_pipeline, LifecycleController};
use doltrun::store::mock::{MockOperation, MockStore};

/// Strategy for generating valid branch name characters.
fn branch_name_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        Just('-'),
        Just('_'),
        Just('.'),
        Just('/'),
    ]
}

/// Strategy for generating valid branch names.
fn valid_branch_name() -> impl Strategy<Value = String> {
    prop::collection::vec(branch_name_char(), 1..40).prop_filter_map(
        "must be valid branch name",
        |chars| {
            let name: String = chars.into_iter().collect();
            if name.starts_with('-')
                || name.ends_with('/')
                || name.contains("..")
                || name.contains("//")
                || name
                    .split('/')
                    .any(|c| c.starts_with('.') || c.ends_with(".lock"))
            {
                None
            } else {
                Some(name)
            }
        },
    )
}

/// Strategy for run ids: printable, non-blank.
fn run_id() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._:-]{0,30}"
}

/// Strategy for extra parameters (without a branch).
fn extras() -> impl Strategy<Value = BTreeMap<String, ParamValue>> {
    let value = prop_oneof![
        any::<bool>().prop_map(ParamValue::Bool),
        any::<i64>().prop_map(ParamValue::Integer),
        "[a-z0-9 ]{0,12}".prop_map(ParamValue::String),
    ];
    prop::collection::btree_map("[a-z][a-z_]{0,8}", value, 0..6)
        .prop_map(|mut m| {
            m.remove("branch");
            m
        })
}

proptest! {
    #[test]
    fn valid_branch_names_accepted(name in valid_branch_name()) {
        let branch = BranchName::new(name.as_str());
        prop_assert!(branch.is_ok(), "rejected {:?}", name);
        let branch = branch.unwrap();
        prop_assert_eq!(branch.as_str(), name.as_str());
    }

    #[test]
    fn messages_are_deterministic(id in run_id(), extra in extras()) {
        let params = RunParameters::new(RunId::new(id.as_str()).unwrap(), extra).unwrap();
        let default = DefaultMessage::new("pipeline");
        let detailed = ExtraParamsMessage::new("pipeline");

        prop_assert_eq!(default.build(&params), default.build(&params.clone()));
        prop_assert_eq!(detailed.build(&params), detailed.build(&params.clone()));
        prop_assert!(detailed.build(&params).starts_with(&default.build(&params)));
        prop_assert!(names_run(&detailed.build(&params), &id));
    }

    #[test]
    fn no_branch_means_no_checkout(id in run_id(), extra in extras(), dirty in any::<bool>()) {
        let store = MockStore::new("main");
        let mut c = LifecycleController::new(store.clone());
        let params = RunParameters::new(RunId::new(id.as_str()).unwrap(), extra).unwrap();

        let outcome = run_pipeline(&mut c, &params, || {
            if dirty {
                store.stage_changes();
            }
            Ok(())
        })
        .unwrap()
        .outcome;

        prop_assert_eq!(store.checkout_count(), 0);
        prop_assert_eq!(store.commit_count(), 1);
        prop_assert_eq!(outcome.commit.is_some(), dirty);
        prop_assert_eq!(store.current(), "main");
    }

    #[test]
    fn branch_round_trip(branch in valid_branch_name(), id in run_id(), dirty in any::<bool>()) {
        prop_assume!(branch != "main");
        let store = MockStore::new("main");
        let mut c = LifecycleController::new(store.clone());
        let params = RunParameters::for_run(RunId::new(id.as_str()).unwrap())
            .with_param("branch", branch.as_str())
            .unwrap();

        let seen = run_pipeline(&mut c, &params, || {
            if dirty {
                store.stage_changes();
            }
            Ok(store.current())
        })
        .unwrap()
        .output;

        prop_assert_eq!(seen, branch.clone());
        prop_assert_eq!(store.current(), "main");
        prop_assert_eq!(store.commits(&branch).len(), usize::from(dirty));

        // The commit always precedes the restore
        let ops = store.operations();
        let commit_at = ops.iter().position(|op| matches!(op, MockOperation::Commit { .. }));
        let restore_at = ops.iter().rposition(|op| {
            *op == MockOperation::Checkout { branch: "main".into() }
        });
        prop_assert!(commit_at.unwrap() < restore_at.unwrap());
    }
}
