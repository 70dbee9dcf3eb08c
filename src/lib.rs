//! # mastery-session
//!
//! Study-session orchestrator for a mastery-learning client.
//!
//! Turns an ordered queue of review-item ids into timed, two-phase
//! (answer → grade) interactions against an external spaced-repetition
//! scheduler: fetches items and interval previews, submits graded reviews,
//! and marks dependent cached views stale. Also provides the interactive
//! `study` terminal front end and OpenTelemetry observability.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod rating;
pub mod session;
pub mod telemetry;
pub mod timer;
pub mod view;
