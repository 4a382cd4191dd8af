//! Parallel execution must produce the same outputs and state as running the block's
//! transactions one after the other, and validation must be repeatable.
use occ_scheduler::{
    Scheduler,
    SchedulerConfig,
};
use occ_storage::{
    Changeset,
    KeyRange,
    MultiVersionStore,
    Order,
    StateDelta,
    StateRead,
    StateWrite,
    Storage,
    Validation,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Read(u8),
    Write(u8),
    Delete(u8),
    Increment(u8),
    Scan { group: u8, limit: usize, descending: bool },
}

fn key(id: u8) -> Vec<u8> {
    vec![b'k', id % 3, id]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..9).prop_map(Op::Read),
        (0u8..9).prop_map(Op::Write),
        (0u8..9).prop_map(Op::Delete),
        (0u8..9).prop_map(Op::Increment),
        (0u8..3, 1usize..5, any::<bool>()).prop_map(|(group, limit, descending)| Op::Scan {
            group,
            limit,
            descending,
        }),
    ]
}

/// Runs one transaction and returns everything it observed. Stops at the first failed
/// read, like a transaction whose execution aborts.
fn run<S: StateRead + StateWrite>(index: usize, ops: &[Op], state: &mut S) -> Vec<Vec<u8>> {
    let mut observed = Vec::new();
    let mut digest = index as u64;
    for op in ops {
        match op {
            Op::Read(id) => {
                let Ok(value) = state.get_raw(&key(*id)) else {
                    return observed;
                };
                let value = value.unwrap_or_default();
                digest = value.iter().fold(digest, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(*b)));
                observed.push(value);
            }
            Op::Write(id) => state.put_raw(key(*id), digest.to_be_bytes().to_vec()),
            Op::Delete(id) => state.delete(key(*id)),
            Op::Increment(id) => {
                let Ok(value) = state.get_raw(&key(*id)) else {
                    return observed;
                };
                let current = value
                    .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
                    .map_or(0, u64::from_be_bytes);
                state.put_raw(key(*id), current.wrapping_add(1).to_be_bytes().to_vec());
                observed.push(current.to_be_bytes().to_vec());
            }
            Op::Scan {
                group,
                limit,
                descending,
            } => {
                let order = if *descending {
                    Order::Descending
                } else {
                    Order::Ascending
                };
                let Ok(iter) = state.iter_raw(KeyRange::prefix([b'k', *group]), order) else {
                    return observed;
                };
                for entry in iter.take(*limit) {
                    let Ok((key, value)) = entry else {
                        return observed;
                    };
                    observed.push(key);
                    observed.push(value);
                }
            }
        }
    }
    observed
}

fn contents(base: &[(u8, u64)], changes: Changeset) -> Vec<(Vec<u8>, Vec<u8>)> {
    let storage = seeded(base);
    storage.commit(changes);
    storage
        .latest_snapshot()
        .iter_raw(KeyRange::all(), Order::Ascending)
        .unwrap()
        .map(Result::unwrap)
        .collect()
}

fn seeded(base: &[(u8, u64)]) -> Storage {
    let storage = Storage::new();
    storage.commit(
        base.iter()
            .map(|(id, value)| (key(*id), Some(value.to_be_bytes().to_vec())))
            .collect(),
    );
    storage
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parallel_execution_matches_sequential_execution(
        base in proptest::collection::vec((0u8..9, any::<u64>()), 0..6),
        txs in proptest::collection::vec(proptest::collection::vec(op(), 1..6), 0..40),
        max_rounds in 0usize..12,
        workers in 1usize..5,
    ) {
        let storage = seeded(&base);

        let mut sequential = StateDelta::new(storage.latest_snapshot());
        let expected_outputs: Vec<_> = txs
            .iter()
            .enumerate()
            .map(|(index, ops)| run(index, ops, &mut sequential))
            .collect();
        let expected_state = contents(&base, sequential.into_changeset());

        let store = MultiVersionStore::new(storage.latest_snapshot());
        let scheduler = Scheduler::new(SchedulerConfig { workers, max_rounds }).unwrap();
        let outcome = scheduler
            .process_all(&store, txs.len(), |view| {
                let index = view.index();
                run(index, &txs[index], view)
            })
            .unwrap();

        prop_assert_eq!(expected_outputs, outcome.outputs);
        prop_assert_eq!(expected_state, contents(&base, store.write_latest_to_store().unwrap()));
        prop_assert!(outcome.stats.rounds <= max_rounds);
    }

    #[test]
    fn validation_is_a_pure_function_of_the_store(
        txs in proptest::collection::vec(proptest::collection::vec(op(), 1..6), 1..24),
        invalidate in proptest::collection::vec(any::<proptest::sample::Index>(), 0..4),
    ) {
        let storage = seeded(&[(0, 1), (4, 2)]);
        let store = MultiVersionStore::new(storage.latest_snapshot());
        let scheduler = Scheduler::new(SchedulerConfig { workers: 4, max_rounds: 10 }).unwrap();
        scheduler
            .process_all(&store, txs.len(), |view| {
                let index = view.index();
                run(index, &txs[index], view)
            })
            .unwrap();

        // once the block is processed every final incarnation is consistent
        for index in 0..txs.len() {
            prop_assert_eq!(Validation::Valid, store.validate_transaction_state(index));
        }

        for writer in &invalidate {
            store.invalidate_writeset(writer.index(txs.len()), 0);
        }
        for index in 0..txs.len() {
            let first = store.validate_transaction_state(index);
            let second = store.validate_transaction_state(index);
            prop_assert_eq!(first, second);
        }
    }
}
