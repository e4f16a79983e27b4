//! This module takes care of scheduling the selection work, encapsulating use
//! of multiple threads and anything else that will come in the future

#[cfg(feature = "multi-threading")]
mod multi_threading;
#[cfg(not(feature = "multi-threading"))]
mod sequential;

use crate::{chain::CutChain, event::EventRecord, tally::ChainTally};

/// Number of events which are read from the source before being selected
///
/// Events are read in batches so that multi-threaded runs have enough work to
/// share between threads, while keeping memory usage bounded for datasets
/// which do not fit in RAM.
///
pub const EVENT_BATCH_SIZE: usize = 10_000;

/// Run a batch of events through a chain, in the manner that was configured at
/// build time.
///
/// Returns the bookkeeping of the batch, and for each event of the batch (in
/// order) the truth that it survived the selection. Results do not depend on
/// the way the work was scheduled.
///
pub fn select_batch(chain: &CutChain, batch: &[EventRecord]) -> (ChainTally, Vec<bool>) {
    // ...in sequential mode
    #[cfg(not(feature = "multi-threading"))]
    {
        sequential::select_batch_impl(chain, batch)
    }

    // ...in multi-threaded mode
    #[cfg(feature = "multi-threading")]
    {
        multi_threading::select_batch_impl(chain, batch)
    }
}

/// Selection kernel shared by all back-ends
fn select_events(chain: &CutChain, events: &[EventRecord]) -> (ChainTally, Vec<bool>) {
    let mut tally = chain.new_tally();
    let survived = events
        .iter()
        .map(|record| chain.apply(record, &mut tally).passed())
        .collect();
    (tally, survived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cuts::CutThresholds,
        event::testing::{random_events, reference_record},
    };

    #[test]
    fn batch_verdicts_follow_event_order() {
        let chain = CutChain::canonical(&CutThresholds::default());
        let mut rejected = reference_record();
        rejected.gamma_count = 2;
        let batch = vec![
            reference_record(),
            rejected.clone(),
            reference_record(),
            rejected,
        ];
        let (tally, survived) = select_batch(&chain, &batch);
        assert_eq!(survived, [true, false, true, false]);
        assert_eq!(tally.events(), 4);
        assert_eq!(tally.survivors(), 2);
        assert_eq!(tally.stage(0).passed, 2);
    }

    #[test]
    fn scheduling_does_not_change_results() {
        let chain = CutChain::canonical(&CutThresholds::default());
        let events = random_events(1_750, 99);
        assert_eq!(select_batch(&chain, &events), select_events(&chain, &events));
    }

    #[test]
    fn empty_batch() {
        let chain = CutChain::canonical(&CutThresholds::default());
        let (tally, survived) = select_batch(&chain, &[]);
        assert!(survived.is_empty());
        assert_eq!(tally, chain.new_tally());
    }
}
