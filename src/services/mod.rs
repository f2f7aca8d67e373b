pub mod keep_alive;
pub mod reporting;
