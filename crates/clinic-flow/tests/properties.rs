//! Randomized operation interleavings against one shared store.
//!
//! Whatever order registrations, claims, and completions arrive in, the
//! durable table must satisfy the record invariants: drawn-at and
//! drawn-by set together or not at all, completion only after a claim,
//! and no completed record ever offered for claiming.

use proptest::prelude::*;

use clinic_flow::{AssignmentCoordinator, FixedClock, StaticResolver};
use clinic_model::{
    CoordinatorOptions, Pid, SessionContext, StaffId, StationId, parse_timestamp,
};
use clinic_store::{MemorySheetStore, RecordStore, TableId, decode_patients};

#[derive(Debug, Clone)]
enum Op {
    Register { pid_idx: u8, priority: bool },
    Claim { pid_idx: u8, staff_idx: u8 },
    Complete { pid_idx: u8, staff_idx: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, any::<bool>()).prop_map(|(pid_idx, priority)| Op::Register { pid_idx, priority }),
        (0u8..4, 0u8..3).prop_map(|(pid_idx, staff_idx)| Op::Claim { pid_idx, staff_idx }),
        (0u8..4, 0u8..3).prop_map(|(pid_idx, staff_idx)| Op::Complete { pid_idx, staff_idx }),
    ]
}

fn pid(idx: u8) -> Pid {
    Pid::new(format!("P{:03}", idx + 1)).expect("pid")
}

fn station_ctx(staff_idx: u8) -> SessionContext {
    SessionContext::new(
        StaffId::new(format!("NV{:02}", staff_idx + 2)).expect("staff"),
        format!("Staff {}", staff_idx + 2),
        StationId::Desk(staff_idx + 1),
    )
}

fn resolver() -> StaticResolver {
    let mut resolver = StaticResolver::new();
    for idx in 0u8..4 {
        resolver = resolver.with_name(pid(idx).as_str(), format!("Patient {}", idx + 1));
    }
    resolver
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn record_invariants_hold_under_any_interleaving(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let store = MemorySheetStore::new();
        let intake = SessionContext::new(
            StaffId::new("NV01").expect("staff"),
            "Intake",
            StationId::Intake,
        );

        for (step, op) in ops.iter().enumerate() {
            // A strictly advancing clock keeps received-at ordering
            // deterministic per run.
            let now = parse_timestamp("2026-01-05 08:00:00").expect("ts")
                + chrono::Duration::seconds(step as i64);
            let coord = AssignmentCoordinator::with_clock(
                store.clone(),
                resolver(),
                CoordinatorOptions::default(),
                FixedClock(now),
            );
            // Individual operations may fail (conflicts, unknown PIDs,
            // not-claimed); the property is about the durable state.
            match op {
                Op::Register { pid_idx, priority } => {
                    let _ = coord.register(&intake, pid(*pid_idx), *priority);
                }
                Op::Claim { pid_idx, staff_idx } => {
                    let _ = coord.claim(&station_ctx(*staff_idx), &pid(*pid_idx));
                }
                Op::Complete { pid_idx, staff_idx } => {
                    let _ = coord.complete_draw(&station_ctx(*staff_idx), &pid(*pid_idx));
                }
            }
        }

        // Durable-state invariants.
        let snapshot = store.read_all(TableId::Patients).expect("read");
        let decoded = decode_patients(&snapshot).expect("decode");
        prop_assert!(decoded.quarantined.is_empty(), "no op may corrupt a row");
        for (_, record) in &decoded.records {
            prop_assert_eq!(record.drawn_at.is_some(), record.drawn_by.is_some());
            if record.draw_completed {
                prop_assert!(record.drawn_at.is_some());
            }
            if record.drawn_at.is_some() {
                prop_assert!(record.station.is_some());
            }
        }

        // No completed record is ever offered for claiming.
        let coord = AssignmentCoordinator::with_clock(
            store.clone(),
            resolver(),
            CoordinatorOptions::default(),
            FixedClock(parse_timestamp("2026-01-05 12:00:00").expect("ts")),
        );
        for staff_idx in 0u8..3 {
            let queue = coord.list_claimable(&station_ctx(staff_idx)).expect("list");
            for record in &queue {
                prop_assert!(!record.draw_completed);
            }
        }
    }
}
