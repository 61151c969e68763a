//! Property-based tests for the code recreation planner.
//!
//! These tests use proptest to generate source topologies and verify that
//! every plan keeps the invariants the target depends on.

#[cfg(test)]
mod proptest_tests {
    use crate::phases::code::{plan, CodeStep, DeployTarget, PlanCase};
    use crate::phases::topology::{DeployableCommits, Topology};
    use crate::site::Env;
    use proptest::prelude::*;

    fn build(test: Option<u32>, live: Option<u32>) -> (Topology, DeployableCommits) {
        let mut topology = Topology::new().with(Env::Dev, true);
        let mut commits = DeployableCommits::new();
        if let Some(n) = test {
            topology = topology.with(Env::Test, true);
            commits = commits.with(Env::Test, n);
        }
        if let Some(n) = live {
            topology = topology.with(Env::Live, true);
            commits = commits.with(Env::Live, n);
        }
        (topology, commits)
    }

    /// Test is always present when live is; counts stay small.
    fn chain() -> impl Strategy<Value = (Option<u32>, Option<u32>)> {
        prop_oneof![
            Just((None, None)),
            (0u32..50).prop_map(|t| (Some(t), None)),
            (0u32..50, 0u32..50).prop_map(|(t, l)| (Some(t), Some(l))),
        ]
    }

    proptest! {
        /// Property: every snapshot is restored before the plan ends
        #[test]
        fn snapshots_are_always_restored((test, live) in chain()) {
            let (t, d) = build(test, live);
            let plan = plan(&t, &d).unwrap();
            let mut open = false;
            for step in &plan.steps {
                match step {
                    CodeStep::Snapshot => open = true,
                    CodeStep::RestoreSnapshot => prop_assert!(open, "restore without snapshot"),
                    _ => {}
                }
            }
            let snapshots = plan.steps.iter().filter(|s| **s == CodeStep::Snapshot).count();
            prop_assert!(snapshots <= 1);
        }

        /// Property: no rewind is ever zero, and none exceeds the total pending count
        #[test]
        fn rewinds_are_bounded((test, live) in chain()) {
            let (t, d) = build(test, live);
            let plan = plan(&t, &d).unwrap();
            let total = test.unwrap_or(0) + live.unwrap_or(0);
            for step in &plan.steps {
                if let CodeStep::Rewind(n) = step {
                    prop_assert!(*n > 0);
                    prop_assert!(*n <= total);
                }
            }
        }

        /// Property: the live environment is only deployed when the source has one
        /// or when test has commits the target must promote past
        #[test]
        fn live_deploys_follow_source((test, live) in chain()) {
            let (t, d) = build(test, live);
            let plan = plan(&t, &d).unwrap();
            if live.is_none() && test.unwrap_or(0) == 0 {
                prop_assert_eq!(plan.deploys_to(DeployTarget::Live), 0);
            }
            if live.is_some() {
                prop_assert!(plan.deploys_to(DeployTarget::Live) >= 1);
            }
        }

        /// Property: every plan pushes the primary branch at least once
        #[test]
        fn every_plan_pushes((test, live) in chain()) {
            let (t, d) = build(test, live);
            let plan = plan(&t, &d).unwrap();
            prop_assert!(plan
                .steps
                .iter()
                .any(|s| matches!(s, CodeStep::Push | CodeStep::ForcePush)));
        }

        /// Property: planning is deterministic
        #[test]
        fn planning_is_deterministic((test, live) in chain()) {
            let (t, d) = build(test, live);
            prop_assert_eq!(plan(&t, &d).unwrap(), plan(&t, &d).unwrap());
        }

        /// Property: a plan that leaves the snapshot branch in place ends with a
        /// non-force push, so later pushes never rewrite promoted history
        #[test]
        fn pending_plans_end_without_force((test, live) in chain()) {
            let (t, d) = build(test, live);
            let plan = plan(&t, &d).unwrap();
            if plan.case == PlanCase::PendingCommits {
                let last_push = plan
                    .steps
                    .iter()
                    .rev()
                    .find(|s| matches!(s, CodeStep::Push | CodeStep::ForcePush));
                prop_assert_eq!(last_push, Some(&CodeStep::Push));
            }
        }
    }
}
