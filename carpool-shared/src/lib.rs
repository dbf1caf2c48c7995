pub mod models;
pub mod pii;

pub use models::booking::{Booking, BookingStatus};
pub use models::page::{Page, PageRequest};
pub use models::ride::Ride;
pub use models::user::{Principal, Role, User};
pub use pii::Masked;
