//! Multi-threaded back-end of the selection

use crate::{chain::CutChain, event::EventRecord, tally::ChainTally};

use std::sync::Mutex;

/// Number of events handled by each parallel task
///
/// Small enough to balance the load between threads, large enough for task
/// spawning overhead to be negligible with respect to the selection work.
///
const TASK_SIZE: usize = 500;

/// Select a batch of events in multi-threaded mode
///
/// Each task keeps its own tally, and tallies are merged in task order once
/// every task is done, so that counters only ever have a single writer.
///
pub fn select_batch_impl(chain: &CutChain, batch: &[EventRecord]) -> (ChainTally, Vec<bool>) {
    // Empty batches can happen when the source is exhausted at a batch boundary
    if batch.is_empty() {
        return (chain.new_tally(), Vec::new());
    }

    // We know in advance how many tasks we will spawn
    let num_tasks = batch.len().div_ceil(TASK_SIZE);
    let accumulator = ReproducibleAccumulator::new(num_tasks);

    // This function is a synchronization scope: it will only return
    // once all inner tasks have been executed
    rayon::scope(|scope| {
        for (task_id, events) in batch.chunks(TASK_SIZE).enumerate() {
            let accumulator_ref = &accumulator;
            scope.spawn(move |_| {
                let result = super::select_events(chain, events);
                accumulator_ref.set_task_result(task_id, result);
            });
        }
    });

    // Extract the results from the accumulator
    accumulator.get_merged_result()
}

/// Per-task result of the selection
type TaskResult = (ChainTally, Vec<bool>);

/// Order-preserving results accumulation mechanism
struct ReproducibleAccumulator {
    /// Storage for the intermediary results of parallel tasks
    results: Box<[Mutex<Option<TaskResult>>]>,
}
//
impl ReproducibleAccumulator {
    /// Set up results storage for N parallel tasks
    fn new(num_tasks: usize) -> Self {
        assert!(num_tasks > 0, "There should be at least one task");
        Self {
            results: (0..num_tasks)
                .map(|_| Mutex::new(None))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    /// Integrate the results of the n-th selection task
    fn set_task_result(&self, task_id: usize, result: TaskResult) {
        let mut lock = self.results[task_id]
            .lock()
            .expect("Mutex data should be valid");
        assert!(lock.is_none(), "Tasks should not report results twice");
        *lock = Some(result);
    }

    /// Aggregate the results in task order
    fn get_merged_result(self) -> TaskResult {
        // Start iterating over the task results
        let mut results_iter = self.results.into_vec().into_iter().map(|entry| {
            entry
                .into_inner()
                .expect("Mutex data should be valid")
                .expect("Result should be ready")
        });

        // Initialize results storage with the result of the first task
        let first_result = results_iter
            .next()
            .expect("There should be at least one task");

        // Merge the results of the other tasks
        results_iter.fold(
            first_result,
            |(mut tally, mut survived), (task_tally, task_survived)| {
                tally.merge(task_tally);
                survived.extend(task_survived);
                (tally, survived)
            },
        )
    }
}
