//! Integer-programming models for logistics: a min-cost flow runner and a
//! two-stage distribution planner (arc selection, then vehicle routing).

pub mod builder;
pub mod config;
pub mod convert;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod flow;
pub mod models;

pub use error::{Error, Result};
