pub mod compress;
pub mod frame;
pub mod memory;
pub mod run_wrapper;

pub mod error;
