use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use shared::{
    Broadcast, CondvarBroadcast, Config, Consumed, Reader, RunOutcome, SemaphoreBroadcast,
    SharedState, SourceError, Value, WorkerReport, Writer,
};

const DEADLINE: Duration = Duration::from_secs(60);

struct Run {
    outcome: RunOutcome,
    /// Consumptions of each reader, in the order that reader made them.
    seen: Vec<Vec<Consumed>>,
    total_writes: u64,
    drained: bool,
}

fn config(readers: u32, writers: u32, slots: usize, total: u64) -> Config {
    Config {
        reader_count: readers,
        writer_count: writers,
        reader_sleep: Duration::ZERO,
        writer_sleep: Duration::ZERO,
        total_elements: total,
        slots,
    }
}

fn simulate<B: Broadcast>(config: Config, data: &[Value]) -> Run {
    let state = SharedState::<B>::new(config, false).unwrap();
    let stop = AtomicBool::new(false);

    let (reports, seen) = thread::scope(|s| {
        // Samples the ledger while the run is going.
        let monitor = s.spawn(|| {
            while !stop.load(Ordering::Relaxed) {
                for entry in state.ledger_snapshot() {
                    assert!(entry.pending <= config.reader_count);
                }
                thread::yield_now();
            }
        });

        let readers: Vec<_> = (0..config.reader_count)
            .map(|id| {
                let state = &state;
                s.spawn(move || {
                    let mut seen = Vec::new();
                    let report = Reader::new(id, config.slots).run_observed(state, |c| seen.push(c));
                    (report, seen)
                })
            })
            .collect();

        let writers: Vec<_> = (0..config.writer_count)
            .map(|id| {
                let state = &state;
                s.spawn(move || Writer::new(id, data).run(state).unwrap())
            })
            .collect();

        let mut reports: Vec<WorkerReport> = Vec::new();
        let mut seen = Vec::new();
        for handle in readers {
            let (report, consumed) = handle.join().unwrap();
            reports.push(report);
            seen.push(consumed);
        }
        reports.extend(writers.into_iter().map(|h| h.join().unwrap()));

        stop.store(true, Ordering::Relaxed);
        monitor.join().unwrap();
        (reports, seen)
    });

    Run {
        outcome: reports.into_iter().collect(),
        seen,
        total_writes: state.total_writes(),
        drained: state.is_drained(),
    }
}

/// Runs `simulate` on a helper thread and fails instead of hanging.
fn simulate_within<B: Broadcast + 'static>(config: Config, data: Vec<Value>) -> Run {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let run = simulate::<B>(config, &data);
        let _ = tx.send(run);
    });
    rx.recv_timeout(DEADLINE)
        .expect("run did not finish, readers or writers are stuck")
}

fn input(total: u64) -> Vec<Value> {
    (0..total as Value).map(|i| i * 10 + 1).collect()
}

fn assert_complete(run: &Run, config: &Config, data: &[Value]) {
    let total = config.total_elements;

    assert!(run.outcome.verify(total).is_empty(), "{:?}", run.outcome);
    assert_eq!(run.outcome.readers.len(), config.reader_count as usize);
    assert_eq!(run.outcome.writers.len(), config.writer_count as usize);
    assert_eq!(run.total_writes, total);
    assert!(run.drained);

    for consumed in &run.seen {
        let sequences: Vec<u64> = consumed.iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, (0..total).collect::<Vec<_>>());

        let values: Vec<Value> = consumed.iter().map(|c| c.value).collect();
        assert_eq!(values, &data[..total as usize]);

        for c in consumed {
            assert_eq!(c.slot, (c.sequence % config.slots as u64) as usize);
        }
    }

    // Each value was read by each reader once: the pending counts left
    // behind by its consumptions are exactly readers-1 down to 0.
    let mut remaining: BTreeMap<u64, Vec<u32>> = BTreeMap::new();
    for c in run.seen.iter().flatten() {
        remaining.entry(c.sequence).or_default().push(c.remaining);
    }
    let expected: Vec<u32> = (0..config.reader_count).collect();
    for (sequence, mut left) in remaining {
        left.sort_unstable();
        assert_eq!(left, expected, "value #{sequence}");
    }
}

#[test]
fn three_readers_two_writers() {
    let config = config(3, 2, 4, 10);
    let data = input(10);
    let run = simulate_within::<CondvarBroadcast>(config, data.clone());
    assert_complete(&run, &config, &data);
}

#[test]
fn single_pair_single_slot_terminates() {
    let config = config(1, 1, 1, 5);
    let data = input(5);
    let run = simulate_within::<CondvarBroadcast>(config, data.clone());
    assert_complete(&run, &config, &data);
}

#[test]
fn many_readers_are_not_starved() {
    let config = config(5, 1, 2, 20);
    let data = input(20);
    let run = simulate_within::<CondvarBroadcast>(config, data.clone());
    assert_complete(&run, &config, &data);
    assert!(run.outcome.readers.iter().all(|r| r.items == 20));
}

#[test]
fn single_slot_runs_in_lock_step() {
    let config = config(3, 2, 1, 30);
    let data = input(30);
    let run = simulate_within::<CondvarBroadcast>(config, data.clone());
    assert_complete(&run, &config, &data);
    assert!(run.seen.iter().flatten().all(|c| c.slot == 0));
}

#[test]
fn semaphore_strategy_completes() {
    for (readers, writers, slots) in [(3, 2, 4), (1, 1, 1), (5, 1, 2), (4, 3, 1)] {
        let config = config(readers, writers, slots, 40);
        let data = input(40);
        let run = simulate_within::<SemaphoreBroadcast>(config, data.clone());
        assert_complete(&run, &config, &data);
    }
}

#[test]
fn repeated_values_are_still_read_once() {
    let config = config(3, 2, 2, 24);
    let data: Vec<Value> = (0..24).map(|i| i % 2).collect();
    let run = simulate_within::<CondvarBroadcast>(config, data.clone());
    assert_complete(&run, &config, &data);
}

#[test]
fn throttled_workers_finish() {
    let config = Config {
        reader_sleep: Duration::from_millis(1),
        writer_sleep: Duration::from_millis(2),
        ..config(2, 2, 3, 12)
    };
    let data = input(12);
    let run = simulate_within::<SemaphoreBroadcast>(config, data.clone());
    assert_complete(&run, &config, &data);
}

#[test]
fn writers_share_the_work() {
    let config = config(2, 4, 8, 200);
    let data = input(200);
    let run = simulate_within::<CondvarBroadcast>(config, data.clone());
    assert_complete(&run, &config, &data);
    assert_eq!(run.outcome.total_written(), 200);
}

#[test]
fn short_input_fails_the_writer() {
    let config = config(1, 1, 4, 3);
    let state = SharedState::<CondvarBroadcast>::new(config, false).unwrap();
    let data = [1, 2];

    let result = Writer::new(0, &data[..]).run(&state);

    assert!(matches!(result, Err(SourceError::Exhausted { sequence: 2 })));
    assert_eq!(state.total_writes(), 2);
}
