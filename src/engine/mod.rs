//! Execution engine for kindform
//!
//! The engine orchestrates:
//! 1. Planning - One converge plan per resource address in the document
//! 2. Diffing - Show what each plan would do
//! 3. Executing - Run the plans in order and record ids in host state

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute, print_summary};
pub use planner::DocumentPlan;
