use std::collections::HashMap;

use proptest::prelude::*;

use imgbatch::config::{LiveSettings, QueueSettings};
use imgbatch::engine::{CoreQueue, ManualClock, WorkerOutcome};
use imgbatch::queue::{DispatchDecision, TaskId, TaskStatus, Timestamp};
use imgbatch::types::ImageData;
use imgbatch_test_utils::builders::{SettingsBuilder, png};

#[derive(Debug, Clone)]
enum Op {
    Enqueue(usize, bool),
    Start,
    Stop,
    Dispatch,
    Finish(usize, bool),
    Regenerate(usize),
    Remove(usize),
    ClockForward(u64),
    ClockBack(u64),
    Ceiling(bool, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (1..4usize, any::<bool>()).prop_map(|(n, paired)| Op::Enqueue(n, paired)),
        2 => Just(Op::Start),
        1 => Just(Op::Stop),
        6 => Just(Op::Dispatch),
        4 => (any::<usize>(), any::<bool>()).prop_map(|(i, ok)| Op::Finish(i, ok)),
        2 => any::<usize>().prop_map(Op::Regenerate),
        1 => any::<usize>().prop_map(Op::Remove),
        2 => (0..50u64).prop_map(Op::ClockForward),
        1 => (0..50u64).prop_map(Op::ClockBack),
        1 => (any::<bool>(), 1..5usize).prop_map(|(on, max)| Op::Ceiling(on, max)),
    ]
}

fn settings(concurrency: bool, max: usize) -> QueueSettings {
    SettingsBuilder::new().concurrency(concurrency, max).build()
}

/// The id the recency rule says must go next: newest `last_activity`,
/// earliest position on ties.
fn expected_next(core: &CoreQueue) -> Option<TaskId> {
    let mut best: Option<(Timestamp, TaskId)> = None;
    for task in core.store().iter() {
        if task.status() != TaskStatus::Pending {
            continue;
        }
        match best {
            Some((ts, _)) if task.last_activity() <= ts => {}
            _ => best = Some((task.last_activity(), task.id())),
        }
    }
    best.map(|(_, id)| id)
}

fn ids_with(core: &CoreQueue, status: Option<TaskStatus>) -> Vec<TaskId> {
    core.store()
        .iter()
        .filter(|t| status.is_none_or(|s| t.status() == s))
        .map(|t| t.id())
        .collect()
}

proptest! {
    #[test]
    fn dispatch_honours_ceiling_recency_and_exclusivity(
        ops in proptest::collection::vec(op_strategy(), 1..80)
    ) {
        let clock = ManualClock::new(10_000);
        let live = LiveSettings::new(settings(true, 2));
        let mut core = CoreQueue::new(live.clone(), Box::new(clock.clone()));
        let mut seen: HashMap<TaskId, Timestamp> = HashMap::new();
        let mut name = 0usize;

        for op in ops {
            match op {
                Op::Enqueue(n, paired) => {
                    let images = (0..n)
                        .map(|_| {
                            name += 1;
                            png(&format!("img{name}.png"))
                        })
                        .collect();
                    core.enqueue(images, paired);
                }
                Op::Start => {
                    core.start();
                }
                Op::Stop => core.stop(),
                Op::Dispatch => {
                    let expected = expected_next(&core);
                    let in_flight_before = ids_with(&core, Some(TaskStatus::Processing));
                    let ceiling = live.current().concurrency_ceiling();
                    let running = core.is_running();

                    match core.next_dispatch() {
                        DispatchDecision::Dispatched(task) => {
                            prop_assert!(running);
                            prop_assert!(!in_flight_before.contains(&task.id));
                            prop_assert_eq!(Some(task.id), expected);
                            prop_assert!(in_flight_before.len() < ceiling);
                            let processing = core.store().counts().processing;
                            prop_assert!(processing <= ceiling);
                        }
                        DispatchDecision::NotRunning => prop_assert!(!running),
                        DispatchDecision::Saturated { active, ceiling: c } => {
                            prop_assert_eq!(c, ceiling);
                            prop_assert!(active >= ceiling);
                            prop_assert!(expected.is_some());
                        }
                        DispatchDecision::AwaitingWorkers { active } => {
                            prop_assert!(active > 0);
                            prop_assert!(expected.is_none());
                        }
                        DispatchDecision::Drained => {
                            prop_assert!(expected.is_none());
                            prop_assert!(in_flight_before.is_empty());
                            prop_assert!(!core.is_running());
                        }
                    }
                }
                Op::Finish(i, ok) => {
                    let in_flight = ids_with(&core, Some(TaskStatus::Processing));
                    if !in_flight.is_empty() {
                        let id = in_flight[i % in_flight.len()];
                        let outcome = if ok {
                            WorkerOutcome::Succeeded {
                                result: ImageData::new(vec![1u8], "image/png"),
                                attempts: 1,
                            }
                        } else {
                            WorkerOutcome::Failed { error: "nope".into(), attempts: 3 }
                        };
                        prop_assert!(core.apply_outcome(id, outcome));
                    }
                }
                Op::Regenerate(i) => {
                    let all = ids_with(&core, None);
                    if !all.is_empty() {
                        let id = all[i % all.len()];
                        let before = core.store().get(id).map(|t| t.status());
                        let res = core.regenerate(id);
                        let busy = matches!(before, Some(TaskStatus::Pending | TaskStatus::Processing));
                        prop_assert_eq!(res.is_err(), busy);
                    }
                }
                Op::Remove(i) => {
                    let all = ids_with(&core, None);
                    if !all.is_empty() {
                        let id = all[i % all.len()];
                        prop_assert!(core.remove(id).is_ok());
                        // A late write-back for the removed task is dropped.
                        let late = WorkerOutcome::Failed { error: "late".into(), attempts: 1 };
                        prop_assert!(!core.apply_outcome(id, late));
                        seen.remove(&id);
                    }
                }
                Op::ClockForward(ms) => clock.advance(ms),
                Op::ClockBack(ms) => clock.set(clock_now(&clock).saturating_sub(ms)),
                Op::Ceiling(on, max) => live.replace(settings(on, max)),
            }

            for task in core.store().iter() {
                if let Some(prev) = seen.insert(task.id(), task.last_activity()) {
                    prop_assert!(task.last_activity() >= prev, "timestamp went backwards");
                }
            }
        }
    }
}

fn clock_now(clock: &ManualClock) -> Timestamp {
    use imgbatch::engine::Clock;
    clock.now_millis()
}
