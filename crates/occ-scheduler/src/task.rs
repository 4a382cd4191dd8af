use std::collections::BTreeSet;

use occ_storage::{
    Incarnation,
    TxIndex,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting to be executed, possibly again.
    Pending,
    Executing,
    /// Executed but not yet validated, or valid while a lower task is not.
    Executed,
    Validating,
    /// Failed validation; requeued at the end of the round.
    Invalid,
    /// Valid, and so is every lower task. Final.
    Validated,
}

/// The scheduling state of one transaction of the block.
#[derive(Debug)]
pub struct Task<O> {
    pub index: TxIndex,
    pub incarnation: Incarnation,
    pub status: TaskStatus,
    /// Transactions that must be validated before this one may execute again.
    pub dependencies: BTreeSet<TxIndex>,
    /// The output of the most recent execution.
    pub output: Option<O>,
    executions: usize,
}

impl<O> Task<O> {
    pub(crate) fn new(index: TxIndex) -> Self {
        Self {
            index,
            incarnation: 0,
            status: TaskStatus::Pending,
            dependencies: BTreeSet::new(),
            output: None,
            executions: 0,
        }
    }

    /// Moves on to the next incarnation and waits for `dependencies`.
    pub(crate) fn requeue(&mut self, dependencies: impl IntoIterator<Item = TxIndex>) {
        self.dependencies.extend(dependencies);
        self.incarnation = self.incarnation.saturating_add(1);
        self.status = TaskStatus::Pending;
    }

    /// The incarnation to use for a sequential re-run.
    pub(crate) fn next_sequential_incarnation(&mut self) -> Incarnation {
        if self.executions > 0 && self.status != TaskStatus::Pending {
            self.incarnation = self.incarnation.saturating_add(1);
        }
        self.incarnation
    }

    pub(crate) fn record_execution(&mut self, output: O) {
        self.executions = self.executions.saturating_add(1);
        self.output = Some(output);
    }

    pub(crate) fn is_validated(&self) -> bool {
        self.status == TaskStatus::Validated
    }
}
