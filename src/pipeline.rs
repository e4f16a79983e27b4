//! Drives a selection run from an event source to an event sink

use crate::{
    chain::CutChain,
    config::Configuration,
    event::EventRecord,
    io::{EventSink, EventSource, SinkError, SourceError},
    scheduling::{self, EVENT_BATCH_SIZE},
    summary::Summary,
};
use thiserror::Error;
use tracing::{debug, info};

/// Failures which abort a selection run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Events could not be read
    #[error("event source unavailable")]
    SourceUnavailable(#[source] SourceError),

    /// A survivor could not be persisted
    #[error("event sink failed after {written} survivors were written, output is incomplete")]
    SinkWriteFailure {
        /// Number of survivors which were successfully written
        written: usize,
        /// Underlying sink error
        #[source]
        source: SinkError,
    },
}

/// Streams events through a selection chain
///
/// Survivors are forwarded to the sink unchanged, in the order in which they
/// were read. The runner owns the run's bookkeeping, which it turns into a
/// summary once the source is exhausted.
///
pub struct PipelineRunner<'chain> {
    chain: &'chain CutChain,
    batch_size: usize,
}
//
impl<'chain> PipelineRunner<'chain> {
    /// Prepare to run events through a chain
    pub fn new(chain: &'chain CutChain) -> Self {
        Self {
            chain,
            batch_size: EVENT_BATCH_SIZE,
        }
    }

    /// Adjust how many events are read before being selected
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "Batches should hold at least one event");
        self.batch_size = batch_size;
        self
    }

    /// Run every event of the source through the chain
    pub fn run(
        &self,
        source: &mut impl EventSource,
        sink: &mut impl EventSink,
    ) -> Result<Summary, PipelineError> {
        let chain = self.chain;
        let mut tally = chain.new_tally();
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut written = 0;
        let mut exhausted = false;
        while !exhausted {
            // Read the next batch of events
            batch.clear();
            exhausted = fill_batch(source, &mut batch, self.batch_size)?;
            if batch.is_empty() {
                break;
            }

            // Select them and integrate the bookkeeping into the run's
            let (batch_tally, survived) = scheduling::select_batch(chain, &batch);
            tally.merge(batch_tally);

            // Forward the survivors to the sink
            for (record, _) in batch.iter().zip(survived).filter(|(_, keep)| *keep) {
                sink.write_event(record)
                    .map_err(|source| PipelineError::SinkWriteFailure { written, source })?;
                written += 1;
            }
            debug!(
                events = tally.events(),
                survivors = written,
                "Batch of {} events selected",
                batch.len()
            );
        }
        sink.finish()
            .map_err(|source| PipelineError::SinkWriteFailure { written, source })?;
        info!(
            "Selection done: {} of {} events survived",
            written,
            tally.events()
        );

        let mut summary = tally.finalize(chain.labels());
        summary.unreadable_records = source.unreadable();
        Ok(summary)
    }
}

/// Read up to `batch_size` events, telling whether the source is exhausted
fn fill_batch(
    source: &mut impl EventSource,
    batch: &mut Vec<EventRecord>,
    batch_size: usize,
) -> Result<bool, PipelineError> {
    while batch.len() < batch_size {
        match source
            .next_event()
            .map_err(PipelineError::SourceUnavailable)?
        {
            Some(record) => batch.push(record),
            None => return Ok(true),
        }
    }
    Ok(false)
}

/// Select the events of a source with the chain described by a configuration
pub fn run(
    source: &mut impl EventSource,
    sink: &mut impl EventSink,
    config: &Configuration,
) -> Result<Summary, PipelineError> {
    let chain = config.chain();
    PipelineRunner::new(&chain).run(source, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cuts::{CutThresholds, StageKind},
        event::testing::{random_events, reference_record},
        io::MemorySource,
    };
    use std::io;

    /// Sink which gives up after a number of events
    struct FailingSink {
        capacity: usize,
        written: Vec<EventRecord>,
    }
    //
    impl EventSink for FailingSink {
        fn write_event(&mut self, record: &EventRecord) -> Result<(), SinkError> {
            if self.written.len() == self.capacity {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
            }
            self.written.push(record.clone());
            Ok(())
        }
    }

    /// Source which breaks down after a number of events
    struct BrokenSource {
        remaining: usize,
    }
    //
    impl EventSource for BrokenSource {
        fn next_event(&mut self) -> Result<Option<EventRecord>, SourceError> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated").into());
            }
            self.remaining -= 1;
            Ok(Some(reference_record()))
        }
    }

    #[test]
    fn counters_are_monotonic() {
        let events = random_events(2_000, 42);
        let chain = CutChain::canonical(&CutThresholds::default());
        let mut sink: Vec<EventRecord> = Vec::new();
        let summary = PipelineRunner::new(&chain)
            .with_batch_size(64)
            .run(&mut MemorySource::new(events.clone()), &mut sink)
            .unwrap();
        assert_eq!(summary.events_read, events.len());
        let counts = summary.pass_counts();
        assert!(counts[0].1 <= events.len());
        for pair in counts.windows(2) {
            assert!(pair[1].1 <= pair[0].1, "{pair:?}");
        }
        assert_eq!(counts.last().unwrap().1, summary.survivors);
        assert_eq!(sink.len(), summary.survivors);
        assert!(summary.survivors > 0);
        assert!(summary.survivors < events.len());
    }

    #[test]
    fn survivors_are_written_verbatim_and_in_order() {
        let events = random_events(500, 7);
        let chain = CutChain::canonical(&CutThresholds::default());
        let expected: Vec<EventRecord> = events
            .iter()
            .filter(|record| {
                chain
                    .stages()
                    .iter()
                    .all(|stage| stage.predicate().keep(record))
            })
            .cloned()
            .collect();
        let mut sink: Vec<EventRecord> = Vec::new();
        PipelineRunner::new(&chain)
            .with_batch_size(33)
            .run(&mut MemorySource::new(events), &mut sink)
            .unwrap();
        assert_eq!(sink, expected);
    }

    #[test]
    fn batch_size_does_not_matter() {
        let events = random_events(300, 1234);
        let chain = CutChain::canonical(&CutThresholds::default());
        let run_with = |batch_size| {
            let mut sink: Vec<EventRecord> = Vec::new();
            let summary = PipelineRunner::new(&chain)
                .with_batch_size(batch_size)
                .run(&mut MemorySource::new(events.clone()), &mut sink)
                .unwrap();
            (summary, sink)
        };
        let reference = run_with(1);
        assert_eq!(run_with(7), reference);
        assert_eq!(run_with(300), reference);
        assert_eq!(run_with(10_000), reference);
    }

    #[test]
    fn survivor_totals() {
        let mut events = vec![reference_record(); 4];
        events[2].electron_count = 2;
        let chain = CutChain::from_kinds(&[StageKind::MinimumEnergy], &CutThresholds::default());
        let summary = PipelineRunner::new(&chain)
            .run(&mut MemorySource::new(events), &mut Vec::<EventRecord>::new())
            .unwrap();
        assert_eq!(summary.survivors, 4);
        assert_eq!(summary.surviving_electrons, 5);
        assert_eq!(summary.surviving_gammas, 4);
        assert_eq!(summary.efficiency, 1.);
    }

    #[test]
    fn empty_source() {
        let summary = run(
            &mut MemorySource::new(Vec::<EventRecord>::new()),
            &mut Vec::<EventRecord>::new(),
            &Configuration::default(),
        )
        .unwrap();
        assert_eq!(summary.events_read, 0);
        assert_eq!(summary.survivors, 0);
        assert!(summary.pass_counts().iter().all(|&(_, count)| count == 0));
    }

    #[test]
    fn sink_failure_is_fatal_and_flags_partial_output() {
        let mut sink = FailingSink {
            capacity: 2,
            written: Vec::new(),
        };
        let result = run(
            &mut MemorySource::new(vec![reference_record(); 5]),
            &mut sink,
            &Configuration::default(),
        );
        match result {
            Err(PipelineError::SinkWriteFailure { written: 2, .. }) => {}
            other => panic!("unexpected run outcome {other:?}"),
        }
        assert_eq!(sink.written.len(), 2);
    }

    #[test]
    fn source_failure_is_fatal() {
        let result = run(
            &mut BrokenSource { remaining: 3 },
            &mut Vec::<EventRecord>::new(),
            &Configuration::default(),
        );
        assert!(matches!(result, Err(PipelineError::SourceUnavailable(_))));
    }
}
