pub mod catalog;
pub mod offer;

pub use catalog::RideCatalog;
pub use offer::NewRide;
