pub mod alerts;
pub mod indicators;
pub mod metrics;
