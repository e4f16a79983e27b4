//! Selection criteria applied to reconstructed events
//!
//! Every criterion is a pure function of an event record and of some
//! thresholds. A criterion either keeps the event or rejects it, and
//! rejections are classified so that malformed records can be told apart from
//! events which genuinely fail the physics requirements.

use crate::{
    event::{EventRecord, MissingField, Slot},
    geometry::{X, Y},
    kinematics::{KinematicsError, KinematicsModel},
    numeric::Float,
};
use prefix_num_ops::real::*;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Why an event was rejected by a selection criterion
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejection {
    /// The event does not fulfill the physics requirement
    #[error("{0}")]
    Domain(&'static str),

    /// The event lacks a field that this criterion needs
    #[error("malformed record: {0}")]
    Malformed(#[from] MissingField),

    /// The decay hypothesis yields no physical timing prediction
    #[error("invalid kinematics: {0}")]
    Kinematics(#[from] KinematicsError),
}
//
impl Rejection {
    /// Coarse classification of this rejection, for bookkeeping
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::Domain(_) => RejectionKind::Domain,
            Rejection::Malformed(_) => RejectionKind::Malformed,
            Rejection::Kinematics(_) => RejectionKind::Kinematics,
        }
    }
}

/// Classes of rejections which are counted separately
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionKind {
    /// Physics requirement not met
    Domain,

    /// Missing per-particle field
    Malformed,

    /// Unphysical timing prediction
    Kinematics,
}

/// A selection criterion
pub trait CutPredicate: Send + Sync {
    /// Short name used to label this criterion in summaries
    fn name(&self) -> &'static str;

    /// Check an event, explaining why it is rejected if it is
    fn check(&self, record: &EventRecord) -> Result<(), Rejection>;

    /// Decide whether an event passes this criterion or should be rejected
    fn keep(&self, record: &EventRecord) -> bool {
        self.check(record).is_ok()
    }
}

/// Exactly one electron and one gamma
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Topology {
    /// Also require that no particle of another species was reconstructed
    pub require_no_other: bool,
}
//
impl CutPredicate for Topology {
    fn name(&self) -> &'static str {
        "topology"
    }

    fn check(&self, record: &EventRecord) -> Result<(), Rejection> {
        if record.electron_count != 1 || record.gamma_count != 1 {
            return Err(Rejection::Domain("not exactly one electron and one gamma"));
        }
        if self.require_no_other && record.other_count != 0 {
            return Err(Rejection::Domain("other particle species present"));
        }
        Ok(())
    }
}

/// Both candidates were detected by calorimeter modules within the fiducial set
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModuleFiducial {
    /// Highest accepted module identifier
    pub module_limit: i32,
}
//
impl CutPredicate for ModuleFiducial {
    fn name(&self) -> &'static str {
        "module_fiducial"
    }

    fn check(&self, record: &EventRecord) -> Result<(), Rejection> {
        // Both candidates must have been reconstructed in the first place
        record.electron_energy()?;
        record.gamma_energy()?;
        for slot in [Slot::Electron, Slot::Gamma] {
            if record.detector_id(slot)? > self.module_limit {
                return Err(Rejection::Domain("calorimeter module out of fiducial set"));
            }
        }
        Ok(())
    }
}

/// The decay vertex lies away from the source foil and the detector edges
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexFiducial {
    /// Half-width of the excluded band around the foil plane (mm)
    pub x_foil_buffer: Float,

    /// Excluded depth in front of the calorimeter walls (mm)
    pub x_calo_buffer: Float,

    /// Excluded depth at both y edges (mm)
    pub y_buffer: Float,

    /// Position of the calorimeter walls, |x| (mm)
    pub x_max: Float,

    /// Position of the y edges, |y| (mm)
    pub y_max: Float,
}
//
impl CutPredicate for VertexFiducial {
    fn name(&self) -> &'static str {
        "vertex_fiducial"
    }

    fn check(&self, record: &EventRecord) -> Result<(), Rejection> {
        let vertex = record.electron_start()?;
        let (x, y) = (vertex[X], vertex[Y]);
        if abs(x) < self.x_foil_buffer {
            return Err(Rejection::Domain("vertex too close to the source foil"));
        }
        if x > self.x_max - self.x_calo_buffer || x < -self.x_max + self.x_calo_buffer {
            return Err(Rejection::Domain("vertex too close to a calorimeter wall"));
        }
        if y > self.y_max - self.y_buffer || y < -self.y_max + self.y_buffer {
            return Err(Rejection::Domain("vertex too close to a y edge"));
        }
        Ok(())
    }
}

/// How the timing residual is compared to its threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingMode {
    /// Residual divided by the electron path length (threshold in ns/mm)
    Normalised,

    /// Bare residual (threshold in ns)
    Raw,
}
//
impl FromStr for TimingMode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normalised" | "normalized" => Ok(TimingMode::Normalised),
            "raw" => Ok(TimingMode::Raw),
            _ => Err(UnknownName {
                what: "timing mode",
                name: s.to_owned(),
            }),
        }
    }
}
//
impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingMode::Normalised => write!(f, "normalised"),
            TimingMode::Raw => write!(f, "raw"),
        }
    }
}

/// The measured hit time difference agrees with the decay hypothesis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingConsistency {
    /// Time-of-flight model
    pub model: KinematicsModel,

    /// Largest accepted residual (ns/mm or ns, depending on the mode)
    pub t_threshold: Float,

    /// How the residual is compared to the threshold
    pub mode: TimingMode,
}
//
impl CutPredicate for TimingConsistency {
    fn name(&self) -> &'static str {
        "timing"
    }

    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    fn check(&self, record: &EventRecord) -> Result<(), Rejection> {
        let dt_meas = record.calo_time(Slot::Electron)? - record.calo_time(Slot::Gamma)?;
        let prediction = self.model.predict(
            record.electron_energy()?,
            &record.electron_start()?,
            &record.electron_end()?,
            &record.gamma_hit()?,
        )?;
        if !(prediction.electron_path > 0.) {
            return Err(KinematicsError::ZeroTrackLength.into());
        }
        let residual = abs(dt_meas - prediction.dt());
        let residual = match self.mode {
            TimingMode::Normalised => residual / prediction.electron_path,
            TimingMode::Raw => residual,
        };
        // NaN residuals must not pass
        if !(residual <= self.t_threshold) {
            return Err(Rejection::Domain("hit times inconsistent with a common origin"));
        }
        Ok(())
    }
}

/// Both candidates carry a minimal energy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimumEnergy {
    /// Lowest accepted candidate energy (MeV)
    pub min_e: Float,
}
//
impl CutPredicate for MinimumEnergy {
    fn name(&self) -> &'static str {
        "min_energy"
    }

    fn check(&self, record: &EventRecord) -> Result<(), Rejection> {
        if record.electron_energy()? < self.min_e || record.gamma_energy()? < self.min_e {
            return Err(Rejection::Domain("candidate energy below threshold"));
        }
        Ok(())
    }
}

/// The summed energy does not exceed the decay endpoint
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TotalEnergy {
    /// Highest accepted summed energy (MeV)
    pub max_e_tot: Float,
}
//
impl CutPredicate for TotalEnergy {
    fn name(&self) -> &'static str {
        "total_energy"
    }

    fn check(&self, record: &EventRecord) -> Result<(), Rejection> {
        if record.electron_energy()? + record.gamma_energy()? > self.max_e_tot {
            return Err(Rejection::Domain("total energy above endpoint"));
        }
        Ok(())
    }
}

/// Thresholds of all selection criteria
#[derive(Clone, Debug, PartialEq)]
pub struct CutThresholds {
    /// Highest accepted calorimeter module identifier
    pub module_limit: i32,

    /// Half-width of the excluded band around the foil (mm)
    pub x_foil_buffer: Float,

    /// Excluded depth in front of the calorimeter walls (mm)
    pub x_calo_buffer: Float,

    /// Excluded depth at the y edges (mm)
    pub y_buffer: Float,

    /// Position of the calorimeter walls (mm)
    pub x_max: Float,

    /// Position of the y edges (mm)
    pub y_max: Float,

    /// Largest accepted timing residual
    pub t_threshold: Float,

    /// How the timing residual is compared to its threshold
    pub timing_mode: TimingMode,

    /// Lowest accepted candidate energy (MeV)
    pub min_e: Float,

    /// Highest accepted summed energy (MeV)
    pub max_e_tot: Float,

    /// Whether the topology cut rejects other particle species
    pub require_no_other: bool,
}
//
impl Default for CutThresholds {
    /// Reference selection thresholds
    fn default() -> Self {
        Self {
            module_limit: 519,
            x_foil_buffer: 60.,
            x_calo_buffer: 100.,
            y_buffer: 30.,
            x_max: 436.,
            y_max: 2494.,
            t_threshold: 0.0323,
            timing_mode: TimingMode::Normalised,
            min_e: 0.05,
            max_e_tot: 3.0,
            require_no_other: true,
        }
    }
}

/// Kinds of selection stages which a chain can be assembled from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    /// See [`Topology`]
    Topology,

    /// See [`ModuleFiducial`]
    ModuleFiducial,

    /// See [`VertexFiducial`]
    VertexFiducial,

    /// See [`TimingConsistency`]
    Timing,

    /// See [`MinimumEnergy`]
    MinimumEnergy,

    /// See [`TotalEnergy`]
    TotalEnergy,
}
//
impl StageKind {
    /// Canonical stage order of the 1e1γ selection
    pub const CANONICAL: [StageKind; 6] = [
        StageKind::Topology,
        StageKind::ModuleFiducial,
        StageKind::VertexFiducial,
        StageKind::Timing,
        StageKind::MinimumEnergy,
        StageKind::TotalEnergy,
    ];

    /// Build the selection criterion of this kind
    pub fn predicate(self, thresholds: &CutThresholds) -> Box<dyn CutPredicate> {
        match self {
            StageKind::Topology => Box::new(Topology {
                require_no_other: thresholds.require_no_other,
            }),
            StageKind::ModuleFiducial => Box::new(ModuleFiducial {
                module_limit: thresholds.module_limit,
            }),
            StageKind::VertexFiducial => Box::new(VertexFiducial {
                x_foil_buffer: thresholds.x_foil_buffer,
                x_calo_buffer: thresholds.x_calo_buffer,
                y_buffer: thresholds.y_buffer,
                x_max: thresholds.x_max,
                y_max: thresholds.y_max,
            }),
            StageKind::Timing => Box::new(TimingConsistency {
                model: KinematicsModel::default(),
                t_threshold: thresholds.t_threshold,
                mode: thresholds.timing_mode,
            }),
            StageKind::MinimumEnergy => Box::new(MinimumEnergy {
                min_e: thresholds.min_e,
            }),
            StageKind::TotalEnergy => Box::new(TotalEnergy {
                max_e_tot: thresholds.max_e_tot,
            }),
        }
    }

    /// Name of this stage, as used in configuration files
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Topology => "topology",
            StageKind::ModuleFiducial => "module_fiducial",
            StageKind::VertexFiducial => "vertex_fiducial",
            StageKind::Timing => "timing",
            StageKind::MinimumEnergy => "min_energy",
            StageKind::TotalEnergy => "total_energy",
        }
    }
}
//
impl FromStr for StageKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CANONICAL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownName {
                what: "selection stage",
                name: s.to_owned(),
            })
    }
}

/// A configuration name did not match any known variant
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown {what} \"{name}\"")]
pub struct UnknownName {
    what: &'static str,
    name: String,
}
