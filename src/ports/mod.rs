//! Port traits at the IO seams.

pub mod config_port;
pub mod data_port;
pub mod report_port;
