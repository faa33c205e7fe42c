//! Embassy async tasks
//!
//! The comm tick runs on the interrupt executor, the sweep loop on the
//! thread executor. They share only the comm context in `channels`.

pub mod comm;
pub mod sweep;

pub use comm::comm_task;
pub use sweep::sweep_task;
