//! 1e1γ: selection of one-electron one-gamma events
//!
//!
//! # Introduction (for the physicist)
//!
//! This small program selects, among reconstructed detector events, those
//! which look like a decay emitting exactly one electron and one gamma from a
//! common vertex. Beyond the particle multiplicities, candidates must hit
//! fiducial calorimeter modules, start away from the source foil and from the
//! detector edges, carry energies compatible with the decay, and arrive in the
//! calorimeter at times which agree with the relativistic time of flight of
//! both particles from the electron track origin.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The selection is a chain of independent cuts. Each event goes through the
//! cuts in order and is dropped by the first one it fails. Survivors are
//! copied untouched to the output, while per-cut counters record how many
//! events made it through each stage. Since events are independent, they can
//! be processed in parallel batches as long as the counters of each batch are
//! merged back in order.

#![warn(missing_docs)]

pub mod chain;
pub mod config;
pub mod cuts;
pub mod event;
pub mod geometry;
pub mod io;
pub mod kinematics;
pub mod numeric;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod scheduling;
pub mod summary;
pub mod tally;

pub use crate::{
    chain::{ChainOutcome, CutChain, CutStage},
    config::Configuration,
    cuts::{CutPredicate, CutThresholds, Rejection, StageKind},
    event::EventRecord,
    kinematics::KinematicsModel,
    pipeline::{run, PipelineError, PipelineRunner},
    summary::Summary,
};

/// We'll use eyre's type-erased result type wherever errors are only reported
pub type Result<T> = eyre::Result<T>;
