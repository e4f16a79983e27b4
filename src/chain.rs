//! Ordered composition of selection criteria

use crate::{
    cuts::{CutPredicate, CutThresholds, Rejection, StageKind},
    event::EventRecord,
    tally::ChainTally,
};
use tracing::debug;

/// A selection criterion, labelled for bookkeeping
pub struct CutStage {
    /// Label under which this stage is reported
    label: String,

    /// Criterion applied by this stage
    predicate: Box<dyn CutPredicate>,
}
//
impl CutStage {
    /// Wrap a criterion, labelling it with its own name
    pub fn new(predicate: Box<dyn CutPredicate>) -> Self {
        Self::labelled(predicate.name(), predicate)
    }

    /// Wrap a criterion under a custom label
    pub fn labelled(label: impl Into<String>, predicate: Box<dyn CutPredicate>) -> Self {
        Self {
            label: label.into(),
            predicate,
        }
    }

    /// Label of this stage
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Criterion applied by this stage
    pub fn predicate(&self) -> &dyn CutPredicate {
        &*self.predicate
    }
}

/// Result of running an event through a chain
#[derive(Clone, Debug, PartialEq)]
pub enum ChainOutcome<'chain> {
    /// The event passed every stage
    Survived,

    /// The event was rejected, and later stages were not evaluated
    Rejected {
        /// Position of the rejecting stage in the chain
        stage: usize,

        /// Label of the rejecting stage
        label: &'chain str,

        /// Why the event was rejected
        reason: Rejection,
    },
}
//
impl ChainOutcome<'_> {
    /// Truth that the event passed every stage
    pub fn passed(&self) -> bool {
        matches!(self, ChainOutcome::Survived)
    }
}

/// Ordered list of selection stages
///
/// Stages are evaluated in order and evaluation stops at the first rejection,
/// so each stage may rely on what the previous ones have established.
///
#[derive(Default)]
pub struct CutChain {
    stages: Vec<CutStage>,
}
//
impl CutChain {
    /// Build a chain from explicitly constructed stages
    pub fn new(stages: Vec<CutStage>) -> Self {
        Self { stages }
    }

    /// Build a chain of standard stages, in the given order
    pub fn from_kinds(kinds: &[StageKind], thresholds: &CutThresholds) -> Self {
        Self::new(
            kinds
                .iter()
                .map(|kind| CutStage::new(kind.predicate(thresholds)))
                .collect(),
        )
    }

    /// Build the full 1e1γ selection, in canonical order
    pub fn canonical(thresholds: &CutThresholds) -> Self {
        Self::from_kinds(&StageKind::CANONICAL, thresholds)
    }

    /// Append a stage at the end of the chain
    pub fn push(&mut self, stage: CutStage) {
        self.stages.push(stage);
    }

    /// Stages of the chain, in evaluation order
    pub fn stages(&self) -> &[CutStage] {
        &self.stages
    }

    /// Number of stages in the chain
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Truth that this chain has no stage, and thus keeps every event
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Labels of the stages, in evaluation order
    pub fn labels(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.label().to_owned()).collect()
    }

    /// Set up an empty tally matching the stages of this chain
    pub fn new_tally(&self) -> ChainTally {
        ChainTally::new(self.len())
    }

    /// Run an event through the chain, recording the outcome in a tally
    ///
    /// A stage is counted as passed only if it was reached and kept the event.
    ///
    pub fn apply(&self, record: &EventRecord, tally: &mut ChainTally) -> ChainOutcome<'_> {
        tally.record_event();
        for (idx, stage) in self.stages.iter().enumerate() {
            if let Err(reason) = stage.predicate.check(record) {
                debug!(stage = stage.label(), %reason, "event rejected");
                tally.record_rejection(idx, reason.kind());
                return ChainOutcome::Rejected {
                    stage: idx,
                    label: stage.label(),
                    reason,
                };
            }
            tally.record_pass(idx);
        }
        tally.record_survivor(record);
        ChainOutcome::Survived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cuts::{RejectionKind, Topology},
        event::testing::reference_record,
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    /// Test double which counts how many times it was evaluated
    struct Probe {
        verdict: bool,
        calls: Arc<AtomicUsize>,
    }
    //
    impl CutPredicate for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn check(&self, _record: &EventRecord) -> Result<(), Rejection> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.verdict {
                Ok(())
            } else {
                Err(Rejection::Domain("probe says no"))
            }
        }
    }

    fn probe(verdict: bool) -> (Box<dyn CutPredicate>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = Probe {
            verdict,
            calls: calls.clone(),
        };
        (Box::new(probe), calls)
    }

    #[test]
    fn short_circuit_on_first_failure() {
        let (p1, p1_calls) = probe(false);
        let (p2, p2_calls) = probe(true);
        let chain = CutChain::new(vec![
            CutStage::labelled("first", p1),
            CutStage::labelled("second", p2),
        ]);
        let mut tally = chain.new_tally();
        let outcome = chain.apply(&reference_record(), &mut tally);
        assert_eq!(
            outcome,
            ChainOutcome::Rejected {
                stage: 0,
                label: "first",
                reason: Rejection::Domain("probe says no"),
            }
        );
        assert_eq!(p1_calls.load(Ordering::Relaxed), 1);
        assert_eq!(p2_calls.load(Ordering::Relaxed), 0);
        assert_eq!(tally.stage(0).passed, 0);
        assert_eq!(tally.stage(0).rejected(RejectionKind::Domain), 1);
        assert_eq!(tally.stage(1).passed, 0);
    }

    #[test]
    fn stages_counted_when_reached_and_passed() {
        let (p1, _) = probe(true);
        let (p2, _) = probe(false);
        let (p3, p3_calls) = probe(true);
        let chain = CutChain::new(vec![CutStage::new(p1), CutStage::new(p2), CutStage::new(p3)]);
        let mut tally = chain.new_tally();
        for _ in 0..4 {
            assert!(!chain.apply(&reference_record(), &mut tally).passed());
        }
        assert_eq!(tally.events(), 4);
        assert_eq!(tally.stage(0).passed, 4);
        assert_eq!(tally.stage(1).passed, 0);
        assert_eq!(tally.stage(2).passed, 0);
        assert_eq!(p3_calls.load(Ordering::Relaxed), 0);
        assert_eq!(tally.survivors(), 0);
    }

    #[test]
    fn canonical_chain_keeps_reference_event() {
        let chain = CutChain::canonical(&CutThresholds::default());
        assert_eq!(
            chain.labels(),
            [
                "topology",
                "module_fiducial",
                "vertex_fiducial",
                "timing",
                "min_energy",
                "total_energy"
            ]
        );
        let mut tally = chain.new_tally();
        assert!(chain.apply(&reference_record(), &mut tally).passed());
        assert!((0..chain.len()).all(|idx| tally.stage(idx).passed == 1));
        assert_eq!(tally.survivors(), 1);
        assert_eq!(tally.surviving_electrons(), 1);
        assert_eq!(tally.surviving_gammas(), 1);
    }

    #[test]
    fn single_stage_chain() {
        let chain = CutChain::from_kinds(&[StageKind::Timing], &CutThresholds::default());
        let mut record = reference_record();
        // The other stages would reject this one, but they are not in the chain
        record.electron_count = 3;
        record.detector_id = vec![1000, 1000];
        let mut tally = chain.new_tally();
        assert!(chain.apply(&record, &mut tally).passed());
        assert_eq!(tally.surviving_electrons(), 3);
    }

    #[test]
    fn malformed_records_are_told_apart() {
        let mut chain = CutChain::new(vec![CutStage::new(Box::new(Topology {
            require_no_other: true,
        }))]);
        chain.push(CutStage::new(StageKind::TotalEnergy.predicate(&CutThresholds::default())));
        let mut tally = chain.new_tally();
        let record = EventRecord {
            energies: vec![0.3],
            ..reference_record()
        };
        let outcome = chain.apply(&record, &mut tally);
        assert!(matches!(
            outcome,
            ChainOutcome::Rejected {
                stage: 1,
                reason: Rejection::Malformed(_),
                ..
            }
        ));
        assert_eq!(tally.stage(1).rejected(RejectionKind::Malformed), 1);
        assert_eq!(tally.stage(1).rejected(RejectionKind::Domain), 0);
    }

    #[test]
    fn empty_chain_keeps_everything() {
        let chain = CutChain::default();
        assert!(chain.is_empty());
        let mut tally = chain.new_tally();
        assert!(chain.apply(&EventRecord::default(), &mut tally).passed());
        assert_eq!(tally.survivors(), 1);
    }
}
