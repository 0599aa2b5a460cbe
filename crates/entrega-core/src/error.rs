//! # Error Types
//!
//! Domain-specific error types for entrega-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  entrega-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  entrega-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  logistics-api errors                                                  │
//! │  └── ApiError         - What the panels see (JSON)                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::order::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Customer is farther than the establishment delivers.
    ///
    /// ## When This Occurs
    /// - `DeliveryFeeRule::max_distance_km` is set and the Haversine
    ///   distance exceeds it
    #[error("Address is {distance_km:.2} km away, delivery limit is {max_km:.2} km")]
    OutOfDeliveryRange { distance_km: f64, max_km: f64 },

    /// Order subtotal does not reach the zone/establishment minimum.
    #[error("Minimum order is {minimum}, subtotal is {subtotal}")]
    BelowMinimumOrder { minimum: Money, subtotal: Money },

    /// Order status has no successor in the lookup table.
    ///
    /// ## User Workflow
    /// ```text
    /// Kitchen panel: "Avançar" on a delivered order
    ///      │
    ///      ▼
    /// OrderStatus::Delivered.next() == None
    ///      │
    ///      ▼
    /// NoNextStatus { status: Delivered }
    /// ```
    #[error("Order is {status:?}, there is no next status")]
    NoNextStatus { status: OrderStatus },

    /// Order cannot be cancelled in its current status.
    #[error("Order is {status:?} and can no longer be cancelled")]
    CannotCancel { status: OrderStatus },

    /// The amount the customer will pay with is less than the total.
    #[error("Change requested for {change_for}, but total is {total}")]
    InsufficientChangeAmount { total: Money, change_for: Money },

    /// Operation requires an open cash register session.
    #[error("Cash register session {0} is closed")]
    SessionClosed(String),

    /// Withdrawal would leave a negative cash balance in the drawer.
    #[error("Cannot withdraw {requested}: only {available} in the drawer")]
    InsufficientCash { available: Money, requested: Money },

    /// Order has exceeded maximum allowed items.
    #[error("Order cannot have more than {max} items")]
    TooManyItems { max: usize },

    /// Order has no items.
    #[error("Order must have at least one item")]
    EmptyOrder,

    /// A money sum left the `i64` range.
    #[error("{field} is too large")]
    AmountOverflow { field: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid phone, non-finite number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl CoreError {
    /// Shorthand for [`CoreError::AmountOverflow`].
    pub fn overflow(field: impl Into<String>) -> Self {
        CoreError::AmountOverflow {
            field: field.into(),
        }
    }
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::MustBePositive`].
    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
