pub mod alert;
pub mod category;
pub mod metrics;
