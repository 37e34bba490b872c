//! Process wiring for the pepperpot binary: environment config and the
//! background content schedule.

pub mod config;
pub mod scheduler;
