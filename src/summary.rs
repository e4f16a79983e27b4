//! This module contains the final results of a selection run: per-stage
//! survival counts, surviving particle totals and selection efficiency

use crate::{numeric::Float, tally::StageTally};
use prefix_num_ops::real::*;
use tracing::info;

/// Outcome of one stage over a whole run
#[derive(Clone, Debug, PartialEq)]
pub struct StageSummary {
    /// Label of the stage
    pub label: String,

    /// Bookkeeping of the stage
    pub tally: StageTally,
}

/// Final results of a selection run
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    /// Number of events read from the source
    pub events_read: usize,

    /// Source entries which could not be decoded into events
    pub unreadable_records: usize,

    /// Per-stage outcome, in chain order
    pub stages: Vec<StageSummary>,

    /// Number of events which passed every stage
    pub survivors: usize,

    /// Total electron multiplicity of surviving events
    pub surviving_electrons: u64,

    /// Total gamma multiplicity of surviving events
    pub surviving_gammas: u64,

    /// Fraction of the events read which survived
    pub efficiency: Float,

    /// Binomial uncertainty on the efficiency
    pub efficiency_uncertainty: Float,
}
//
impl Summary {
    /// Assemble the summary of a run
    pub fn new(
        events_read: usize,
        stages: Vec<(String, StageTally)>,
        survivors: usize,
        surviving_electrons: u64,
        surviving_gammas: u64,
    ) -> Self {
        let (efficiency, efficiency_uncertainty) = selection_efficiency(survivors, events_read);
        Self {
            events_read,
            unreadable_records: 0,
            stages: stages
                .into_iter()
                .map(|(label, tally)| StageSummary { label, tally })
                .collect(),
            survivors,
            surviving_electrons,
            surviving_gammas,
            efficiency,
            efficiency_uncertainty,
        }
    }

    /// Ordered (stage label, pass count) pairs
    pub fn pass_counts(&self) -> Vec<(&str, usize)> {
        self.stages
            .iter()
            .map(|stage| (stage.label.as_str(), stage.tally.passed))
            .collect()
    }

    /// Send the summary to the log
    pub fn log(&self) {
        info!("Events read: {}", self.events_read);
        if self.unreadable_records > 0 {
            info!("Unreadable records skipped: {}", self.unreadable_records);
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            let tally = &stage.tally;
            info!(
                "Passed cut {} ({}): {} (rejected: {} domain, {} malformed, {} kinematics)",
                idx + 1,
                stage.label,
                tally.passed,
                tally.rejected_domain,
                tally.rejected_malformed,
                tally.rejected_kinematics
            );
        }
        info!("Final surviving events: {}", self.survivors);
        info!("Total surviving electrons: {}", self.surviving_electrons);
        info!("Total surviving gammas: {}", self.surviving_gammas);
        info!(
            "Selection efficiency: {:.6e} ± {:.2e}",
            self.efficiency, self.efficiency_uncertainty
        );
    }
}

/// Fraction of selected events and its binomial uncertainty
///
/// An empty input has a null efficiency, with a null uncertainty.
///
pub fn selection_efficiency(selected: usize, total: usize) -> (Float, Float) {
    if total == 0 {
        return (0., 0.);
    }
    let n = total as Float;
    let eff = selected as Float / n;
    (eff, sqrt(eff * (1. - eff) / n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn efficiency() {
        assert_eq!(selection_efficiency(0, 0), (0., 0.));
        assert_eq!(selection_efficiency(10, 10), (1., 0.));
        let (eff, unc) = selection_efficiency(25, 100);
        assert_eq!(eff, 0.25);
        assert!(abs(unc - sqrt(0.25 * 0.75 / 100.)) < 1e-12);
    }

    #[test]
    fn pass_counts_keep_chain_order() {
        let tally = |passed| StageTally {
            passed,
            ..StageTally::default()
        };
        let summary = Summary::new(
            8,
            vec![("b".into(), tally(5)), ("a".into(), tally(2))],
            2,
            2,
            2,
        );
        assert_eq!(summary.pass_counts(), [("b", 5), ("a", 2)]);
        assert_eq!(summary.efficiency, 0.25);
    }
}
