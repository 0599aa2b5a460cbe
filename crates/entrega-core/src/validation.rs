//! # Validation Module
//!
//! Input validation for orders, zones and cash movements.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: PWA / panels (TypeScript)                                    │
//! │  └── Empty fields, masks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: logistics-api handler (Rust)                                 │
//! │  ├── JSON deserialization                                              │
//! │  └── THIS MODULE: business rules                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── NOT NULL / UNIQUE / CHECK / FOREIGN KEY                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use entrega_core::validation::{validate_phone, validate_quantity};
//!
//! assert!(validate_phone("(11) 98765-4321").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_MONEY_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a customer name.
///
/// ## Rules
/// - Must not be empty
/// - At most 120 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_name("customer_name", name, 120)
}

/// Validates a delivery zone name (neighbourhood, condominium).
///
/// ```rust
/// use entrega_core::validation::validate_zone_name;
///
/// assert!(validate_zone_name("Vila Madalena").is_ok());
/// assert!(validate_zone_name("  ").is_err());
/// ```
pub fn validate_zone_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 80)
}

/// Validates an operator name for the cash register.
pub fn validate_operator(operator: &str) -> ValidationResult<()> {
    validate_name("operator", operator, 60)
}

/// Validates a Brazilian phone number.
///
/// ## Rules
/// - Formatting characters `()+-. ` are ignored
/// - 10 or 11 digits (DDD + number), optionally prefixed by country code 55
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::required("customer_phone"));
    }

    let mut digits = String::with_capacity(phone.len());
    for c in phone.chars() {
        match c {
            '0'..='9' => digits.push(c),
            '(' | ')' | '+' | '-' | '.' | ' ' => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "customer_phone".to_string(),
                    reason: "must contain only digits".to_string(),
                })
            }
        }
    }

    let national = match digits.len() {
        12 | 13 if digits.starts_with("55") => &digits[2..],
        _ => digits.as_str(),
    };

    if !(10..=11).contains(&national.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "customer_phone".to_string(),
            reason: "expected DDD and 8 or 9 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a free-text address search for geocoding.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_address_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() < 3 {
        return Err(ValidationError::TooShort {
            field: "query".to_string(),
            min: 3,
        });
    }

    if query.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 200,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1.0,
            max: MAX_ITEM_QUANTITY as f64,
        });
    }

    Ok(())
}

/// Validates a submitted amount.
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_MONEY_CENTS (R$ 10.000.000,00)
///
/// ```rust
/// use entrega_core::money::Money;
/// use entrega_core::validation::validate_amount;
///
/// assert!(validate_amount("unit_price", Money::from_cents(4590)).is_ok());
/// assert!(validate_amount("unit_price", Money::from_cents(-1)).is_err());
/// assert!(validate_amount("unit_price", Money::from_cents(i64::MAX)).is_err());
/// ```
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_MONEY_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: MAX_MONEY_CENTS as f64,
        });
    }

    Ok(())
}

/// Validates a distance in kilometers coming from config or a request.
pub fn validate_km(field: &str, km: f64) -> ValidationResult<()> {
    if !km.is_finite() || km < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Id Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use entrega_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
