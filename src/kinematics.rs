//! Time-of-flight model of the 1e1γ decay hypothesis
//!
//! Under the hypothesis that the electron and the gamma were emitted together
//! from the electron track origin, the electron reaches its calorimeter module
//! at a speed given by its kinetic energy while the gamma flies in a straight
//! line at the speed of light. This yields an expected difference between the
//! two calorimeter hit times, which the timing cut compares to the measured
//! one.

use crate::{
    geometry::{self, Position},
    numeric::{
        consts::{ELECTRON_MASS, SPEED_OF_LIGHT},
        Float,
    },
};
use prefix_num_ops::real::*;
use thiserror::Error;

/// Reasons why the decay hypothesis cannot produce a physical prediction
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum KinematicsError {
    /// Total energy does not exceed the rest mass
    #[error("total electron energy {total} MeV does not exceed its rest mass")]
    NonPositiveKineticEnergy {
        /// Total electron energy (MeV)
        total: Float,
    },

    /// Speed fraction out of the open (0, 1) interval
    #[error("electron speed fraction {0} is not strictly between 0 and 1")]
    UnphysicalSpeed(Float),

    /// Electron track of zero length
    #[error("electron track has zero length")]
    ZeroTrackLength,
}

/// Expected hit timing of a 1e1γ event
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingPrediction {
    /// Electron speed as a fraction of the speed of light
    pub beta_e: Float,

    /// Electron path length (mm)
    pub electron_path: Float,

    /// Gamma path length (mm)
    pub gamma_path: Float,

    /// Expected electron time of flight (ns)
    pub electron_tof: Float,

    /// Expected gamma time of flight (ns)
    pub gamma_tof: Float,
}
//
impl TimingPrediction {
    /// Expected electron minus gamma hit time difference (ns)
    pub fn dt(&self) -> Float {
        self.electron_tof - self.gamma_tof
    }
}

/// Relativistic time-of-flight model
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KinematicsModel {
    /// Electron rest mass (MeV)
    pub electron_mass: Float,

    /// Speed of light (mm/ns)
    pub speed_of_light: Float,
}
//
impl Default for KinematicsModel {
    fn default() -> Self {
        Self {
            electron_mass: ELECTRON_MASS,
            speed_of_light: SPEED_OF_LIGHT,
        }
    }
}
//
impl KinematicsModel {
    /// Electron speed as a fraction of c, given its kinetic energy (MeV)
    ///
    /// NaN inputs yield an error, hence the negated comparisons.
    ///
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn electron_beta(&self, kinetic_energy: Float) -> Result<Float, KinematicsError> {
        let m_e = self.electron_mass;
        let total = kinetic_energy + m_e;
        if !(total > m_e) {
            return Err(KinematicsError::NonPositiveKineticEnergy { total });
        }
        let beta = sqrt(1. - (m_e / total).powi(2));
        if !(beta > 0. && beta < 1.) {
            return Err(KinematicsError::UnphysicalSpeed(beta));
        }
        Ok(beta)
    }

    /// Predict the hit timing of an electron and a gamma emitted together
    ///
    /// Both particles start from `origin`. The electron ends its track at
    /// `electron_end`, the gamma deposits its energy at `gamma_hit`.
    ///
    pub fn predict(
        &self,
        kinetic_energy: Float,
        origin: &Position,
        electron_end: &Position,
        gamma_hit: &Position,
    ) -> Result<TimingPrediction, KinematicsError> {
        let beta_e = self.electron_beta(kinetic_energy)?;
        let electron_path = geometry::distance(origin, electron_end);
        let gamma_path = geometry::distance(origin, gamma_hit);
        let c = self.speed_of_light;
        Ok(TimingPrediction {
            beta_e,
            electron_path,
            gamma_path,
            electron_tof: electron_path / (beta_e * c),
            gamma_tof: gamma_path / c,
        })
    }

    /// Expected electron minus gamma hit time difference (ns)
    pub fn expected_dt(
        &self,
        kinetic_energy: Float,
        origin: &Position,
        electron_end: &Position,
        gamma_hit: &Position,
    ) -> Result<Float, KinematicsError> {
        self.predict(kinetic_energy, origin, electron_end, gamma_hit)
            .map(|prediction| prediction.dt())
    }
}
