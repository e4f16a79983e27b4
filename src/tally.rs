//! This module accumulates selection statistics across processed events

use crate::{cuts::RejectionKind, event::EventRecord, summary::Summary};

/// Bookkeeping of one selection stage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageTally {
    /// Number of events which reached this stage and passed it
    pub passed: usize,

    /// Number of events which failed the physics requirement
    pub rejected_domain: usize,

    /// Number of events which lacked a required field
    pub rejected_malformed: usize,

    /// Number of events without a physical timing prediction
    pub rejected_kinematics: usize,
}
//
impl StageTally {
    /// Number of rejections of a given kind
    pub fn rejected(&self, kind: RejectionKind) -> usize {
        match kind {
            RejectionKind::Domain => self.rejected_domain,
            RejectionKind::Malformed => self.rejected_malformed,
            RejectionKind::Kinematics => self.rejected_kinematics,
        }
    }

    /// Number of events which reached this stage
    pub fn reached(&self) -> usize {
        self.passed + self.rejected_domain + self.rejected_malformed + self.rejected_kinematics
    }

    fn merge(&mut self, other: &Self) {
        self.passed += other.passed;
        self.rejected_domain += other.rejected_domain;
        self.rejected_malformed += other.rejected_malformed;
        self.rejected_kinematics += other.rejected_kinematics;
    }
}

/// This struct accumulates the outcome of running events through a chain,
/// and ultimately produces the run summary (see Summary).
///
/// Counters only ever grow. Tallies of disjoint event sets can be merged,
/// which is how per-task results are combined in multi-threaded runs.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTally {
    /// Number of events run through the chain
    events: usize,

    /// Per-stage bookkeeping, in chain order
    stages: Box<[StageTally]>,

    /// Number of events which passed every stage
    survivors: usize,

    /// Total electron multiplicity of surviving events
    surviving_electrons: u64,

    /// Total gamma multiplicity of surviving events
    surviving_gammas: u64,
}
//
impl ChainTally {
    /// Prepare for bookkeeping of a chain with some number of stages
    pub fn new(num_stages: usize) -> Self {
        Self {
            events: 0,
            stages: vec![StageTally::default(); num_stages].into_boxed_slice(),
            survivors: 0,
            surviving_electrons: 0,
            surviving_gammas: 0,
        }
    }

    /// Account for an event entering the chain
    pub fn record_event(&mut self) {
        self.events += 1;
    }

    /// Account for an event passing a stage
    pub fn record_pass(&mut self, stage: usize) {
        self.stages[stage].passed += 1;
    }

    /// Account for an event being rejected by a stage
    pub fn record_rejection(&mut self, stage: usize, kind: RejectionKind) {
        let stage = &mut self.stages[stage];
        match kind {
            RejectionKind::Domain => stage.rejected_domain += 1,
            RejectionKind::Malformed => stage.rejected_malformed += 1,
            RejectionKind::Kinematics => stage.rejected_kinematics += 1,
        }
    }

    /// Account for an event passing the whole chain
    pub fn record_survivor(&mut self, record: &EventRecord) {
        self.survivors += 1;
        self.surviving_electrons += u64::from(record.electron_count);
        self.surviving_gammas += u64::from(record.gamma_count);
    }

    /// Number of events run through the chain so far
    pub fn events(&self) -> usize {
        self.events
    }

    /// Bookkeeping of one stage
    pub fn stage(&self, stage: usize) -> &StageTally {
        &self.stages[stage]
    }

    /// Number of stages being tracked
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    /// Number of events which passed every stage
    pub fn survivors(&self) -> usize {
        self.survivors
    }

    /// Total electron multiplicity of surviving events
    pub fn surviving_electrons(&self) -> u64 {
        self.surviving_electrons
    }

    /// Total gamma multiplicity of surviving events
    pub fn surviving_gammas(&self) -> u64 {
        self.surviving_gammas
    }

    /// Integrate the bookkeeping of another, disjoint set of events
    #[allow(clippy::needless_pass_by_value)]
    pub fn merge(&mut self, other: Self) {
        assert_eq!(
            self.stages.len(),
            other.stages.len(),
            "Can only merge tallies of the same chain"
        );
        self.events += other.events;
        for (mine, theirs) in self.stages.iter_mut().zip(other.stages.iter()) {
            mine.merge(theirs);
        }
        self.survivors += other.survivors;
        self.surviving_electrons += other.surviving_electrons;
        self.surviving_gammas += other.surviving_gammas;
    }

    /// Turn the bookkeeping into a run summary, given the stage labels
    pub fn finalize(self, labels: Vec<String>) -> Summary {
        assert_eq!(
            labels.len(),
            self.stages.len(),
            "Each stage should have exactly one label"
        );
        Summary::new(
            self.events,
            labels.into_iter().zip(self.stages.iter().copied()).collect(),
            self.survivors,
            self.surviving_electrons,
            self.surviving_gammas,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::testing::reference_record;

    fn sample_tally(passes: usize, rejections: usize) -> ChainTally {
        let mut tally = ChainTally::new(2);
        for _ in 0..passes {
            tally.record_event();
            tally.record_pass(0);
            tally.record_pass(1);
            tally.record_survivor(&reference_record());
        }
        for _ in 0..rejections {
            tally.record_event();
            tally.record_pass(0);
            tally.record_rejection(1, RejectionKind::Kinematics);
        }
        tally
    }

    #[test]
    fn merge_adds_up() {
        let mut left = sample_tally(2, 1);
        left.merge(sample_tally(3, 4));
        assert_eq!(left, sample_tally(5, 5));
        assert_eq!(left.events(), 10);
        assert_eq!(left.stage(0).passed, 10);
        assert_eq!(left.stage(1).reached(), 10);
        assert_eq!(left.stage(1).rejected(RejectionKind::Kinematics), 5);
        assert_eq!(left.surviving_gammas(), 5);
    }

    #[test]
    #[should_panic]
    fn merge_rejects_mismatched_chains() {
        ChainTally::new(1).merge(ChainTally::new(2));
    }

    #[test]
    fn finalize_labels_stages() {
        let summary = sample_tally(1, 2).finalize(vec!["a".into(), "b".into()]);
        assert_eq!(summary.pass_counts(), [("a", 3), ("b", 1)]);
        assert_eq!(summary.survivors, 1);
    }
}
