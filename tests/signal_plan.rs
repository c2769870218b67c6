//! Timing properties of the signal controller.

use intersection_sim::{Policy, SegmentId, SignalController, SignalGroup, SignalPlan, SubState};
use proptest::prelude::*;
use slotmap::SlotMap;
use std::collections::HashMap;

fn segments() -> [SegmentId; 2] {
    let mut ids = SlotMap::<SegmentId, ()>::with_key();
    [ids.insert(()), ids.insert(())]
}

fn plan(
    ids: [SegmentId; 2],
    policy: Policy,
    green: [u32; 2],
    bounds: [(u32, u32); 2],
    yellow: u32,
    all_red: u32,
) -> SignalPlan {
    let groups = (0..2)
        .map(|i| SignalGroup {
            segments: [ids[i]].into_iter().collect(),
            green: green[i],
            min_green: bounds[i].0,
            max_green: bounds[i].1,
        })
        .collect();
    SignalPlan {
        groups,
        yellow,
        all_red,
        policy,
        theta: 3,
    }
}

proptest! {
    /// Under the fixed plan every phase lasts exactly `green + yellow + all_red` ticks,
    /// whatever the queues.
    #[test]
    fn fixed_cycle_length(
        green in [1u32..60, 1u32..60],
        yellow in 0u32..6,
        all_red in 0u32..4,
        queues in prop::collection::vec((0usize..30, 0usize..30), 200),
    ) {
        let ids = segments();
        let mut ctrl = SignalController::new(
            plan(ids, Policy::Fixed, green, [(1, 1), (1, 1)], yellow, all_red),
        );
        let mut phase_start = 0;
        for (tick, (a, b)) in queues.into_iter().enumerate() {
            let phase = ctrl.phase();
            ctrl.step(&HashMap::from([(ids[0], a), (ids[1], b)]));
            if ctrl.phase() != phase {
                let length = tick + 1 - phase_start;
                prop_assert_eq!(length as u32, green[phase] + yellow + all_red);
                prop_assert_eq!(ctrl.sub_state(), SubState::Green);
                prop_assert_eq!(ctrl.elapsed(), 0);
                phase_start = tick + 1;
            }
        }
    }

    /// An adaptive green is never cut before `min_green` nor held past `max_green`.
    #[test]
    fn adaptive_green_within_bounds(
        min in [0u32..20, 0u32..20],
        extra in [1u32..30, 1u32..30],
        queues in prop::collection::vec((0usize..30, 0usize..30), 300),
    ) {
        let bounds = [(min[0], min[0] + extra[0]), (min[1], min[1] + extra[1])];
        let ids = segments();
        let mut ctrl = SignalController::new(
            plan(ids, Policy::Adaptive, [10, 10], bounds, 3, 1),
        );
        for (a, b) in queues {
            let (phase, sub, elapsed) = (ctrl.phase(), ctrl.sub_state(), ctrl.elapsed());
            ctrl.step(&HashMap::from([(ids[0], a), (ids[1], b)]));
            if sub == SubState::Green {
                let (min_green, max_green) = bounds[phase];
                prop_assert!(elapsed <= max_green);
                if ctrl.sub_state() != SubState::Green {
                    prop_assert!(elapsed >= min_green);
                }
            }
        }
    }
}

#[test]
fn adaptive_switches_when_queues_balance() {
    let ids = segments();
    let mut ctrl = SignalController::new(plan(
        ids,
        Policy::Adaptive,
        [25, 15],
        [(10, 40), (8, 25)],
        3,
        1,
    ));
    let queues = HashMap::from([(ids[0], 10), (ids[1], 10)]);
    for _ in 0..10 {
        ctrl.step(&queues);
    }
    assert_eq!(ctrl.elapsed(), 10);
    ctrl.step(&queues);
    assert_eq!(ctrl.sub_state(), SubState::Yellow);
}
