//! Sensor roster and sweep poller

mod device;
mod poller;

pub use device::{DeviceInfo, Roster};
pub use poller::{
    Poller, SweepOutcome, SweepReport, SweepState, TransferStatus, MAX_READ_ATTEMPTS,
    MAX_REPLY_LEN,
};
