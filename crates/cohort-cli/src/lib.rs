//! # cohort-cli
//!
//! Terminal front end for the cohort occupancy tracker.
//!
//! This library provides the command line definition, logging setup, and the
//! coloured terminal operator used by the `cohort` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod cli;
pub mod commands;
pub mod logging;
pub mod state;
pub mod terminal;
