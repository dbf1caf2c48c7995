pub mod booking;
pub mod page;
pub mod ride;
pub mod user;
