//! proctor-core: Exam session state machine, countdown, and scoring.
//!
//! This crate defines the data model, the session lifecycle, and the traits
//! for the exam store and report sink that the rest of proctor builds on.

pub mod countdown;
pub mod error;
pub mod ledger;
pub mod model;
pub mod parser;
pub mod proctor;
pub mod review;
pub mod runner;
pub mod scoring;
pub mod session;
pub mod traits;
