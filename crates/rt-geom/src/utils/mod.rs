pub mod counter;
pub mod log_once;
