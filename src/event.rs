//! This module defines the properties and storage of reconstructed events

use crate::{
    geometry::{self, Position, SPACE_DIM},
    numeric::Float,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error;

/// Raw coordinate triple, as stored in event records (mm)
pub type Coordinates = [Float; SPACE_DIM];

/// Particle slot of the two candidates of the 1e1γ topology
///
/// Upstream reconstruction assigns the electron candidate to the first slot of
/// every per-particle sequence and the gamma candidate to the second one.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Electron candidate
    Electron,

    /// Gamma candidate
    Gamma,
}
//
impl Slot {
    /// Position of this slot in per-particle sequences
    pub const fn index(self) -> usize {
        match self {
            Slot::Electron => 0,
            Slot::Gamma => 1,
        }
    }
}
//
impl Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Electron => write!(f, "electron"),
            Slot::Gamma => write!(f, "gamma"),
        }
    }
}

/// A per-particle field was read for a slot that the record does not fill
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("record has no {field} entry for the {slot} slot")]
pub struct MissingField {
    /// Name of the per-particle sequence
    pub field: &'static str,

    /// Slot which was requested
    pub slot: Slot,
}

/// One reconstructed detector event
///
/// Records are never modified once read: survivors of the selection are
/// written back exactly as they were received.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Number of reconstructed electrons
    pub electron_count: u32,

    /// Number of reconstructed gammas
    pub gamma_count: u32,

    /// Number of reconstructed particles of other species (alphas...)
    #[serde(default)]
    pub other_count: u32,

    /// Per-particle kinetic energy (MeV)
    #[serde(default)]
    pub energies: Vec<Float>,

    /// Per-particle track origin (mm)
    #[serde(default)]
    pub vertex_start: Vec<Coordinates>,

    /// Per-particle track end or energy deposit location (mm)
    #[serde(default)]
    pub vertex_end: Vec<Coordinates>,

    /// Per-particle calorimeter hit time (ns)
    #[serde(default)]
    pub calo_time: Vec<Float>,

    /// Per-particle calorimeter module identifier
    #[serde(default)]
    pub detector_id: Vec<i32>,
}
//
impl EventRecord {
    /// Kinetic energy of a candidate (MeV)
    pub fn energy(&self, slot: Slot) -> Result<Float, MissingField> {
        slot_value(&self.energies, "energy", slot).copied()
    }

    /// Kinetic energy of the electron candidate (MeV)
    pub fn electron_energy(&self) -> Result<Float, MissingField> {
        self.energy(Slot::Electron)
    }

    /// Energy deposited by the gamma candidate (MeV)
    pub fn gamma_energy(&self) -> Result<Float, MissingField> {
        self.energy(Slot::Gamma)
    }

    /// Track origin of a candidate
    pub fn start_vertex(&self, slot: Slot) -> Result<Position, MissingField> {
        slot_value(&self.vertex_start, "vertex_start", slot).map(geometry::position)
    }

    /// Track end of a candidate
    pub fn end_vertex(&self, slot: Slot) -> Result<Position, MissingField> {
        slot_value(&self.vertex_end, "vertex_end", slot).map(geometry::position)
    }

    /// Where the electron track starts, which is also the decay vertex
    pub fn electron_start(&self) -> Result<Position, MissingField> {
        self.start_vertex(Slot::Electron)
    }

    /// Where the electron track ends in the calorimeter
    pub fn electron_end(&self) -> Result<Position, MissingField> {
        self.end_vertex(Slot::Electron)
    }

    /// Where the gamma deposited its energy
    pub fn gamma_hit(&self) -> Result<Position, MissingField> {
        self.end_vertex(Slot::Gamma)
    }

    /// Calorimeter hit time of a candidate (ns)
    pub fn calo_time(&self, slot: Slot) -> Result<Float, MissingField> {
        slot_value(&self.calo_time, "calo_time", slot).copied()
    }

    /// Calorimeter module which registered a candidate
    pub fn detector_id(&self, slot: Slot) -> Result<i32, MissingField> {
        slot_value(&self.detector_id, "detector_id", slot).copied()
    }
}

/// Look up the entry of a per-particle sequence for some slot
fn slot_value<'rec, T>(
    values: &'rec [T],
    field: &'static str,
    slot: Slot,
) -> Result<&'rec T, MissingField> {
    values.get(slot.index()).ok_or(MissingField { field, slot })
}

impl Display for EventRecord {
    /// Compact one-line summary, for diagnostics
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "{}e {}γ {}x | E = {:?} MeV | t = {:?} ns | OM = {:?}",
            self.electron_count,
            self.gamma_count,
            self.other_count,
            self.energies,
            self.calo_time,
            self.detector_id
        )
    }
}


#[cfg(test)]
mod tests {
    use super::{testing::reference_record, *};
    use crate::geometry::X;

    #[test]
    fn slot_accessors() {
        let record = reference_record();
        assert_eq!(record.electron_energy(), Ok(1.0));
        assert_eq!(record.gamma_energy(), Ok(1.0));
        assert_eq!(record.electron_start().unwrap()[X], 100.);
        assert_eq!(record.electron_end().unwrap()[X], 435.);
        assert_eq!(record.gamma_hit().unwrap()[X], -435.);
        assert_eq!(record.calo_time(Slot::Gamma), Ok(10.6));
        assert_eq!(record.detector_id(Slot::Electron), Ok(100));
    }

    #[test]
    fn absent_slot_is_missing_not_zero() {
        let record = EventRecord {
            energies: vec![0.7],
            ..reference_record()
        };
        assert_eq!(record.electron_energy(), Ok(0.7));
        assert_eq!(
            record.gamma_energy(),
            Err(MissingField {
                field: "energy",
                slot: Slot::Gamma
            })
        );
    }

    #[test]
    fn other_species_defaults_to_zero() {
        let record: EventRecord = serde_json::from_str(
            r#"{"electron_count": 1, "gamma_count": 1, "energies": [0.5, 0.5]}"#,
        )
        .unwrap();
        assert_eq!(record.other_count, 0);
        assert!(record.calo_time.is_empty());
    }
}
