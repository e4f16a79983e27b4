//! Sequential back-end of the selection

use crate::{chain::CutChain, event::EventRecord, tally::ChainTally};

/// Select a batch of events in sequential mode
pub fn select_batch_impl(chain: &CutChain, batch: &[EventRecord]) -> (ChainTally, Vec<bool>) {
    super::select_events(chain, batch)
}
