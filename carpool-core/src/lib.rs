pub mod authz;
pub mod repository;
pub mod search;

use carpool_shared::BookingStatus;

pub use authz::{AuthorizationGate, Capability};

/// The specific rule a conflicting request ran into.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictKind {
    #[error("Driver cannot book their own ride")]
    SelfBooking,
    #[error("Passenger has already booked this ride")]
    DuplicateBooking,
    #[error("No available seats for this ride")]
    NoSeats,
    #[error("Cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("Booking is already cancelled")]
    AlreadyCancelled,
    #[error("Username '{0}' already exists")]
    DuplicateUsername(String),
    #[error("Email already exists")]
    DuplicateEmail,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Conflict(#[from] ConflictKind),
    #[error("{0}")]
    Forbidden(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Internal service error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{} not found with ID: {}", what, id))
    }

    pub fn conflict_kind(&self) -> Option<&ConflictKind> {
        match self {
            CoreError::Conflict(kind) => Some(kind),
            _ => None,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_not_found_message() {
        let id = Uuid::nil();
        let err = CoreError::not_found("Ride", id);
        assert_eq!(err.to_string(), format!("Ride not found with ID: {}", id));
    }

    #[test]
    fn test_conflict_is_transparent() {
        let err: CoreError = ConflictKind::InvalidTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Confirmed,
        }
        .into();
        assert_eq!(err.to_string(), "Cannot move booking from CANCELLED to CONFIRMED");
        assert!(matches!(
            err.conflict_kind(),
            Some(ConflictKind::InvalidTransition { .. })
        ));
    }
}
