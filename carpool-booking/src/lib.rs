pub mod ledger;
pub mod locks;

pub use ledger::{BookingLedger, SeatAudit};
pub use locks::RideLocks;
