//! Daily leader assignment for multi-day group reading events.
//!
//! An event is split into numbered day slots ("schedules"), and every slot
//! needs one daily leader who posts the discussion material. This crate
//! decides who leads each day and keeps that ledger healthy:
//!
//! - `assignment::engine`: bulk allocation under the random, balanced,
//!   rotation and voluntary policies
//! - `assignment::authority`: self-claims, owner reassignment and backup fills
//! - `assignment::backup`: detection and ranking of slots that need a substitute
//! - `assignment::stats`: workload and coverage metrics
//! - `assignment::permission`: the authoring window and capability flags
//!
//! Storage, rosters and content signals are reached through the traits in
//! `store`; `service::LeaderService` wires them together.

pub mod assignment;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod utils;

pub use error::{AssignmentError, ErrorKind, Failure};
pub use service::LeaderService;
