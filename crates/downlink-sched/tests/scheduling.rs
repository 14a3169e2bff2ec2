//! Integration tests for CPU pool scheduling.
//!
//! These drive the pool through its public API only: admitting and
//! releasing tasks, ticking challenges to completion, and checking the
//! capacity invariants over long randomized admit/release sequences.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use downlink_sched::{
    Challenge, ChallengeRegistry, ComputeUnit, CpuPool, Cracker, Dictionary, PoolEvent,
    SchedError, SequentialAttacker, Task,
};
use downlink_types::{ChallengeId, TaskId};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn single_unit_pool(speed: Decimal) -> CpuPool {
    CpuPool::new(vec![ComputeUnit::new("CPU", speed)])
}

fn plain_task(minimum: Decimal) -> Task {
    Task::new(
        "Plain Task",
        ChallengeId::new(),
        Some(minimum),
        Cracker::Sequential(SequentialAttacker::new(1)),
    )
}

#[test]
fn second_task_takes_half_of_the_first() {
    let mut pool = single_unit_pool(dec!(20));
    let t1 = pool.add_task(plain_task(dec!(5))).unwrap();
    assert_eq!(pool.task(t1).unwrap().cycles_per_tick(), dec!(20));

    let t2 = pool.add_task(plain_task(dec!(5))).unwrap();
    assert_eq!(pool.task(t1).unwrap().cycles_per_tick(), dec!(10));
    assert_eq!(pool.task(t2).unwrap().cycles_per_tick(), dec!(10));
    assert_eq!(pool.load(), dec!(10));
}

#[test]
fn oversized_minimum_is_refused_without_side_effects() {
    let mut pool = single_unit_pool(dec!(10));
    let result = pool.add_task(plain_task(dec!(15)));
    assert!(matches!(
        result,
        Err(SchedError::InsufficientCapacity { .. })
    ));
    assert_eq!(pool.load(), dec!(0));
    assert!(pool.tasks().is_empty());
}

#[test]
fn halving_branch_releases_half() {
    let mut task = plain_task(dec!(10));
    task.set_cycles_per_tick(dec!(12)).unwrap();
    assert_eq!(task.free_cycles(dec!(5)), dec!(6));
    assert_eq!(task.cycles_per_tick(), dec!(6));
}

#[test]
fn small_encryption_grid_cracks_one_cell_per_tick() {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut challenges = ChallengeRegistry::new();
    let mut pool = single_unit_pool(dec!(4));
    let mut challenge = Challenge::encryption("Linear", 2, 2, dec!(4));
    let task = Task::for_challenge(&mut challenge, &Dictionary::default(), &mut rng).unwrap();
    let challenge_id = challenges.insert(challenge);
    let task_id = pool.add_task(task).unwrap();
    assert_eq!(pool.task(task_id).unwrap().cycles_per_tick(), dec!(4));

    for tick in 1..=3 {
        let finished = pool.tick(&mut challenges, &mut rng).unwrap();
        assert!(finished.is_empty(), "finished early on tick {tick}");
        let percentage = pool.task(task_id).unwrap().percentage();
        assert_eq!(percentage, Decimal::from(tick) / dec!(4));
    }
    let finished = pool.tick(&mut challenges, &mut rng).unwrap();
    assert_eq!(finished, vec![task_id]);
    assert!(pool.tasks().is_empty());
    assert_eq!(pool.load(), dec!(0));
    assert!(challenges.get(challenge_id).unwrap().is_solved());
    assert!(pool.units().iter().all(|unit| unit.ticks_run() == 4));
}

#[test]
fn dictionary_password_falls_to_its_cracker() {
    let mut rng = SmallRng::seed_from_u64(7);
    let dictionary: Dictionary = (0..50).map(|i| format!("word{i}")).collect();
    let mut challenges = ChallengeRegistry::new();
    let mut challenge = Challenge::dictionary_password(10, &dictionary, &mut rng).unwrap();
    let task = Task::for_challenge(&mut challenge, &dictionary, &mut rng).unwrap();
    let challenge_id = challenges.insert(challenge);

    let mut pool = single_unit_pool(dec!(5));
    let task_id = pool.add_task(task).unwrap();
    let mut ticks: u32 = 0;
    while pool.task(task_id).is_some() {
        pool.tick(&mut challenges, &mut rng).unwrap();
        ticks = ticks.saturating_add(1);
        assert!(ticks <= 10, "50 words at 5 guesses a tick take at most 10 ticks");
    }
    assert!(challenges.get(challenge_id).unwrap().is_solved());
}

#[test]
fn completion_redistributes_on_the_next_tick() {
    let mut rng = SmallRng::seed_from_u64(3);
    let mut challenges = ChallengeRegistry::new();
    let mut pool = single_unit_pool(dec!(20));

    let mut quick = Challenge::encryption("Linear", 1, 1, dec!(5));
    let quick_task = Task::for_challenge(&mut quick, &Dictionary::default(), &mut rng).unwrap();
    challenges.insert(quick);
    let mut slow = Challenge::encryption("Linear", 10, 10, dec!(5));
    let slow_task = Task::for_challenge(&mut slow, &Dictionary::default(), &mut rng).unwrap();
    challenges.insert(slow);

    let quick_id = pool.add_task(quick_task).unwrap();
    let slow_id = pool.add_task(slow_task).unwrap();
    assert_eq!(pool.task(slow_id).unwrap().cycles_per_tick(), dec!(10));

    let released = Arc::new(Mutex::new(Vec::<TaskId>::new()));
    let sink = Arc::clone(&released);
    pool.events_mut().on("taskComplete", move |event: &PoolEvent| {
        let PoolEvent::TaskComplete { task } = event;
        sink.lock().unwrap().push(*task);
    });

    let finished = pool.tick(&mut challenges, &mut rng).unwrap();
    assert_eq!(finished, vec![quick_id]);
    assert_eq!(*released.lock().unwrap(), vec![quick_id]);
    assert_eq!(pool.task(slow_id).unwrap().cycles_per_tick(), dec!(20));
    assert_eq!(pool.load(), dec!(5));
}

#[test]
fn randomized_admissions_never_overcommit() {
    let mut rng = SmallRng::seed_from_u64(2024);
    let mut pool = CpuPool::new(vec![
        ComputeUnit::new("A", dec!(20)),
        ComputeUnit::new("B", dec!(30)),
        ComputeUnit::new("C", dec!(50)),
    ]);

    for _ in 0..500 {
        let admit = pool.tasks().is_empty() || rng.random_bool(0.6);
        if admit {
            let minimum = Decimal::from(rng.random_range(1_u32..=40));
            match pool.add_task(plain_task(minimum)) {
                Ok(id) => {
                    let task = pool.task(id).unwrap();
                    assert!(task.cycles_per_tick() >= task.minimum_required_cycles());
                }
                Err(
                    SchedError::InsufficientCapacity { .. }
                    | SchedError::OverloadAssignment { .. },
                ) => {}
                Err(other) => panic!("unexpected admission error: {other}"),
            }
        } else {
            let index = rng.random_range(0..pool.tasks().len());
            let id = pool.tasks().get(index).unwrap().id();
            pool.complete_task(id).unwrap();
        }

        let minimums: Decimal = pool
            .tasks()
            .iter()
            .map(Task::minimum_required_cycles)
            .sum();
        assert_eq!(pool.load(), minimums);
        assert!(pool.load() <= pool.total_speed());
        assert_eq!(pool.free_cycles(), pool.total_speed().saturating_sub(pool.load()));
    }
}
