//! Threshold scans, used to tune one selection cut at a time
//!
//! A scan runs the same dataset through the selection once per value of a
//! chosen threshold, and reports how the selection efficiency evolves.

use crate::{
    chain::CutChain,
    config::Configuration,
    cuts::CutThresholds,
    event::EventRecord,
    numeric::Float,
    scheduling::{self, EVENT_BATCH_SIZE},
    summary::selection_efficiency,
};
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::info;

/// Threshold which a scan can vary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanParameter {
    /// Highest accepted calorimeter module identifier
    ModuleLimit,

    /// Half-width of the excluded band around the foil
    XFoilBuffer,

    /// Excluded depth in front of the calorimeter walls
    XCaloBuffer,

    /// Excluded depth at the y edges
    YBuffer,

    /// Largest accepted timing residual
    TThreshold,

    /// Lowest accepted candidate energy
    MinEnergy,

    /// Highest accepted summed energy
    MaxTotalEnergy,
}
//
impl ScanParameter {
    const ALL: [ScanParameter; 7] = [
        ScanParameter::ModuleLimit,
        ScanParameter::XFoilBuffer,
        ScanParameter::XCaloBuffer,
        ScanParameter::YBuffer,
        ScanParameter::TThreshold,
        ScanParameter::MinEnergy,
        ScanParameter::MaxTotalEnergy,
    ];

    /// Name of this threshold, as used in configuration files
    pub fn name(self) -> &'static str {
        match self {
            ScanParameter::ModuleLimit => "module_limit",
            ScanParameter::XFoilBuffer => "x_foil_buffer",
            ScanParameter::XCaloBuffer => "x_calo_buffer",
            ScanParameter::YBuffer => "y_buffer",
            ScanParameter::TThreshold => "t_threshold",
            ScanParameter::MinEnergy => "min_e",
            ScanParameter::MaxTotalEnergy => "max_e_tot",
        }
    }

    /// Set this threshold to some value
    ///
    /// Module identifiers are integers, so the value is rounded for them.
    ///
    pub fn apply(self, thresholds: &mut CutThresholds, value: Float) {
        match self {
            ScanParameter::ModuleLimit => thresholds.module_limit = value.round() as i32,
            ScanParameter::XFoilBuffer => thresholds.x_foil_buffer = value,
            ScanParameter::XCaloBuffer => thresholds.x_calo_buffer = value,
            ScanParameter::YBuffer => thresholds.y_buffer = value,
            ScanParameter::TThreshold => thresholds.t_threshold = value,
            ScanParameter::MinEnergy => thresholds.min_e = value,
            ScanParameter::MaxTotalEnergy => thresholds.max_e_tot = value,
        }
    }
}
//
impl FromStr for ScanParameter {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|parameter| parameter.name() == s)
            .ok_or_else(|| ScanError::UnknownParameter(s.to_owned()))
    }
}
//
impl fmt::Display for ScanParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Invalid scan request
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScanError {
    /// No such threshold
    #[error("cannot scan unknown threshold \"{0}\"")]
    UnknownParameter(String),

    /// The requested range does not describe any value
    #[error("invalid scan range from {start} to {stop} by steps of {step}")]
    InvalidRange {
        /// First value
        start: Float,
        /// Last value
        stop: Float,
        /// Increment between values
        step: Float,
    },
}

/// Largest number of values in a threshold scan
pub const MAX_SCAN_POINTS: usize = 1_000_000;

/// Evenly spaced threshold values, from `start` to `stop` included
///
/// `stop` is included as long as it is within a small fraction of a step
/// from the grid, so that rounding errors do not drop the last value. Ranges
/// of more than [`MAX_SCAN_POINTS`] values are rejected.
///
pub fn threshold_grid(start: Float, stop: Float, step: Float) -> Result<Vec<Float>, ScanError> {
    let valid = step > 0. && stop >= start && start.is_finite() && stop.is_finite();
    if !valid {
        return Err(ScanError::InvalidRange { start, stop, step });
    }
    let num_steps = ((stop - start) / step + 1e-6).floor();
    if !(num_steps.is_finite() && num_steps < MAX_SCAN_POINTS as Float) {
        return Err(ScanError::InvalidRange { start, stop, step });
    }
    let num_steps = num_steps as usize;
    Ok((0..=num_steps)
        .map(|idx| start + idx as Float * step)
        .collect())
}

/// Efficiency of the selection at one threshold value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanPoint {
    /// Threshold value
    pub value: Float,

    /// Number of surviving events
    pub selected: usize,

    /// Fraction of surviving events
    pub efficiency: Float,

    /// Binomial uncertainty on the efficiency
    pub efficiency_uncertainty: Float,
}

/// Run a dataset through the configured selection for each threshold value
pub fn scan(
    events: &[EventRecord],
    config: &Configuration,
    parameter: ScanParameter,
    values: &[Float],
) -> Vec<ScanPoint> {
    values
        .iter()
        .map(|&value| {
            let mut thresholds = config.thresholds.clone();
            parameter.apply(&mut thresholds, value);
            let chain = CutChain::from_kinds(&config.stages, &thresholds);
            let mut tally = chain.new_tally();
            for batch in events.chunks(EVENT_BATCH_SIZE) {
                tally.merge(scheduling::select_batch(&chain, batch).0);
            }
            let selected = tally.survivors();
            let (efficiency, efficiency_uncertainty) =
                selection_efficiency(selected, events.len());
            info!(
                "{} = {}: {} of {} events selected",
                parameter,
                value,
                selected,
                events.len()
            );
            ScanPoint {
                value,
                selected,
                efficiency,
                efficiency_uncertainty,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cuts::StageKind, event::testing::reference_record};

    #[test]
    fn grid_includes_both_ends() {
        assert_eq!(threshold_grid(45., 90., 5.).unwrap().len(), 10);
        let grid = threshold_grid(0.05, 0.15, 0.01).unwrap();
        assert_eq!(grid.len(), 11);
        assert_eq!(grid[0], 0.05);
        assert!((grid[10] - 0.15).abs() < 1e-9);
        assert_eq!(threshold_grid(3., 3., 1.).unwrap(), [3.]);
    }

    #[test]
    fn invalid_grids() {
        assert!(threshold_grid(1., 0., 0.1).is_err());
        assert!(threshold_grid(0., 1., 0.).is_err());
        assert!(threshold_grid(0., 1., -0.1).is_err());
        assert!(threshold_grid(0., Float::NAN, 0.1).is_err());
    }

    #[test]
    fn oversized_grids() {
        assert_eq!(
            threshold_grid(0., 1., 1e-30),
            Err(ScanError::InvalidRange {
                start: 0.,
                stop: 1.,
                step: 1e-30
            })
        );
        assert!(threshold_grid(0., 1., Float::MIN_POSITIVE).is_err());
        assert!(threshold_grid(-1e30, 1e30, 1.).is_err());
        let largest = threshold_grid(0., (MAX_SCAN_POINTS - 1) as Float, 1.).unwrap();
        assert_eq!(largest.len(), MAX_SCAN_POINTS);
    }

    #[test]
    fn parameter_names() {
        for parameter in ScanParameter::ALL {
            assert_eq!(parameter.name().parse(), Ok(parameter));
        }
        assert_eq!(
            "y_max".parse::<ScanParameter>(),
            Err(ScanError::UnknownParameter("y_max".into()))
        );
    }

    #[test]
    fn module_limit_is_rounded() {
        let mut thresholds = CutThresholds::default();
        ScanParameter::ModuleLimit.apply(&mut thresholds, 411.6);
        assert_eq!(thresholds.module_limit, 412);
    }

    #[test]
    fn looser_energy_floor_selects_more() {
        let events: Vec<EventRecord> = (1..=10)
            .map(|idx| {
                let mut record = reference_record();
                record.energies = vec![0.1 * idx as Float, 1.0];
                record
            })
            .collect();
        let config = Configuration {
            stages: vec![StageKind::Topology, StageKind::MinimumEnergy],
            ..Configuration::default()
        };
        let values = threshold_grid(0.2, 0.8, 0.3).unwrap();
        let points = scan(&events, &config, ScanParameter::MinEnergy, &values);
        let selected: Vec<usize> = points.iter().map(|point| point.selected).collect();
        assert_eq!(selected, [9, 6, 3]);
        assert_eq!(points[0].efficiency, 0.9);
        assert!(points.windows(2).all(|pair| pair[1].efficiency <= pair[0].efficiency));
    }
}
