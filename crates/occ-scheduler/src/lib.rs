//! Parallel execution of a block's transactions over a [`MultiVersionStore`].
//!
//! The scheduler runs rounds. Each round executes every eligible pending task on the
//! worker pool, then validates every executed task. Validation results are computed in
//! parallel but applied in index order: a task only becomes
//! [`TaskStatus::Validated`] once it and every task below it validated, at which point
//! it is final. Invalid tasks turn their writes into estimates, wait for the
//! transactions they conflicted with and run again with a new incarnation.
//!
//! After `max_rounds` rounds everything from the first task that is not validated
//! is executed sequentially in index order.
use occ_storage::{
    ExecutionOutput,
    Incarnation,
    MultiVersionStore,
    StateRead,
    TxIndex,
    Validation,
    VersionIndexedStore,
};
use rayon::prelude::*;
use tracing::{
    debug,
    instrument,
    warn,
};

mod error;
mod task;

pub use error::Error;
pub use task::{
    Task,
    TaskStatus,
};

pub const DEFAULT_MAX_ROUNDS: usize = 10;

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// The number of worker threads. `0` lets rayon pick one per core.
    pub workers: usize,
    /// The number of parallel rounds before falling back to sequential execution.
    pub max_rounds: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub rounds: usize,
    pub executions: usize,
    pub aborts: usize,
    pub invalidations: usize,
    /// The first index executed by the sequential fallback, if it ran.
    pub sequential_from: Option<TxIndex>,
}

#[derive(Debug)]
pub struct SchedulerOutcome<O> {
    /// The output of every transaction's final incarnation, in index order.
    pub outputs: Vec<O>,
    pub stats: SchedulerStats,
}

pub struct Scheduler {
    pool: rayon::ThreadPool,
    max_rounds: usize,
}

impl Scheduler {
    /// Builds the worker pool.
    ///
    /// # Errors
    /// Returns an error if the thread pool could not be built.
    pub fn new(config: SchedulerConfig) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("occ-worker-{i}"))
            .build()
            .map_err(Error::ThreadPool)?;
        Ok(Self {
            pool,
            max_rounds: config.max_rounds,
        })
    }

    /// Executes transactions `0..tx_count` against `store`.
    ///
    /// `deliver` runs one incarnation of one transaction against the given view. It may
    /// be called several times per transaction; only the output of the final
    /// incarnation is returned. When this returns, the latest version of every key in
    /// `store` is the state sequential execution in index order would have produced.
    ///
    /// # Errors
    /// Returns an error if a transaction read an estimate during the sequential
    /// fallback, which would mean the store was left in an inconsistent state.
    #[instrument(skip_all, fields(tx_count = tx_count), err)]
    pub fn process_all<S, O, F>(
        &self,
        store: &MultiVersionStore<S>,
        tx_count: usize,
        deliver: F,
    ) -> Result<SchedulerOutcome<O>, Error>
    where
        S: StateRead + Sync,
        O: Send,
        F: Fn(&mut VersionIndexedStore<'_, S>) -> O + Sync,
    {
        let mut tasks: Vec<Task<O>> = (0..tx_count).map(Task::new).collect();
        let mut stats = SchedulerStats::default();

        while stats.rounds < self.max_rounds && !tasks.iter().all(Task::is_validated) {
            stats.rounds = stats.rounds.saturating_add(1);
            self.execute_round(store, &mut tasks, &deliver, &mut stats);
            self.validate_round(store, &mut tasks, &mut stats);
            debug!(
                round = stats.rounds,
                validated = tasks.iter().filter(|task| task.is_validated()).count(),
                "finished round"
            );
        }

        if let Some(first) = tasks.iter().position(|task| !task.is_validated()) {
            if self.max_rounds > 0 {
                warn!(
                    first_unvalidated = first,
                    max_rounds = self.max_rounds,
                    "round budget exhausted; executing remaining transactions sequentially"
                );
            }
            stats.sequential_from = Some(first);
            run_sequentially(store, &mut tasks[first..], &deliver, &mut stats)?;
        }

        let outputs = tasks
            .into_iter()
            .map(|task| {
                task.output.ok_or(Error::MissingOutput {
                    index: task.index,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            rounds = stats.rounds,
            executions = stats.executions,
            aborts = stats.aborts,
            invalidations = stats.invalidations,
            sequential_from = stats.sequential_from,
            "processed all transactions"
        );
        Ok(SchedulerOutcome {
            outputs,
            stats,
        })
    }

    /// Executes every pending task whose dependencies are all validated.
    fn execute_round<S, O, F>(
        &self,
        store: &MultiVersionStore<S>,
        tasks: &mut [Task<O>],
        deliver: &F,
        stats: &mut SchedulerStats,
    ) where
        S: StateRead + Sync,
        O: Send,
        F: Fn(&mut VersionIndexedStore<'_, S>) -> O + Sync,
    {
        let eligible: Vec<_> = tasks
            .iter()
            .filter(|task| {
                task.status == TaskStatus::Pending
                    && task
                        .dependencies
                        .iter()
                        .all(|dependency| tasks.get(*dependency).map_or(true, Task::is_validated))
            })
            .map(|task| (task.index, task.incarnation))
            .collect();
        for (index, _) in &eligible {
            tasks[*index].status = TaskStatus::Executing;
        }

        let executed: Vec<(TxIndex, O, Option<TxIndex>)> = self.pool.install(|| {
            eligible
                .par_iter()
                .map(|&(index, incarnation)| {
                    let mut view = VersionIndexedStore::new(store, index, incarnation);
                    let output = deliver(&mut view);
                    let execution = view.finish();
                    let abort = execution.abort;
                    publish(store, index, incarnation, execution);
                    if abort.is_some() {
                        store.invalidate_writeset(index, incarnation);
                    }
                    (index, output, abort)
                })
                .collect()
        });

        for (index, output, abort) in executed {
            stats.executions = stats.executions.saturating_add(1);
            let task = &mut tasks[index];
            task.record_execution(output);
            match abort {
                Some(writer) => {
                    stats.aborts = stats.aborts.saturating_add(1);
                    task.requeue([writer]);
                }
                None => task.status = TaskStatus::Executed,
            }
        }
    }

    fn validate_round<S, O>(
        &self,
        store: &MultiVersionStore<S>,
        tasks: &mut [Task<O>],
        stats: &mut SchedulerStats,
    ) where
        S: StateRead + Sync,
    {
        let candidates: Vec<_> = tasks
            .iter_mut()
            .filter(|task| task.status == TaskStatus::Executed)
            .map(|task| {
                task.status = TaskStatus::Validating;
                task.index
            })
            .collect();
        let results: Vec<(TxIndex, Validation)> = self.pool.install(|| {
            candidates
                .par_iter()
                .map(|&index| (index, store.validate_transaction_state(index)))
                .collect()
        });

        let mut results = results.into_iter().peekable();
        let mut prefix_validated = true;
        for task in tasks.iter_mut() {
            if task.status == TaskStatus::Validating {
                let Some((_, validation)) = results.next_if(|(index, _)| *index == task.index)
                else {
                    task.status = TaskStatus::Executed;
                    prefix_validated = false;
                    continue;
                };
                match validation {
                    Validation::Valid if prefix_validated => task.status = TaskStatus::Validated,
                    Validation::Valid => task.status = TaskStatus::Executed,
                    Validation::Invalid {
                        conflicts,
                    } => {
                        stats.invalidations = stats.invalidations.saturating_add(1);
                        debug!(
                            index = task.index,
                            incarnation = task.incarnation,
                            ?conflicts,
                            "invalidated transaction"
                        );
                        task.status = TaskStatus::Invalid;
                        task.dependencies.extend(conflicts);
                    }
                }
            }
            prefix_validated &= task.is_validated();
        }

        for task in tasks.iter_mut().filter(|task| task.status == TaskStatus::Invalid) {
            store.invalidate_writeset(task.index, task.incarnation);
            task.requeue([]);
        }
    }
}

fn publish<S: StateRead>(
    store: &MultiVersionStore<S>,
    index: TxIndex,
    incarnation: Incarnation,
    execution: ExecutionOutput,
) {
    let ExecutionOutput {
        writeset,
        readset,
        iterateset,
        ..
    } = execution;
    store.set_writeset(index, incarnation, writeset);
    store.set_readset(index, readset);
    store.set_iterateset(index, iterateset);
}

/// Executes `tasks` one after the other, without validation.
fn run_sequentially<S, O, F>(
    store: &MultiVersionStore<S>,
    tasks: &mut [Task<O>],
    deliver: &F,
    stats: &mut SchedulerStats,
) -> Result<(), Error>
where
    S: StateRead,
    F: Fn(&mut VersionIndexedStore<'_, S>) -> O,
{
    for task in tasks {
        let incarnation = task.next_sequential_incarnation();
        let mut view = VersionIndexedStore::new(store, task.index, incarnation);
        let output = deliver(&mut view);
        let execution = view.finish();
        if let Some(writer) = execution.abort {
            return Err(Error::EstimateDuringSequential {
                index: task.index,
                writer,
            });
        }
        publish(store, task.index, incarnation, execution);
        stats.executions = stats.executions.saturating_add(1);
        task.record_execution(output);
        task.status = TaskStatus::Validated;
    }
    Ok(())
}
