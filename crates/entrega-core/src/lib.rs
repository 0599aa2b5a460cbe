//! # entrega-core: Pure Business Logic for Entrega
//!
//! This crate holds the logistics and cash-register logic of the delivery
//! platform as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Entrega Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │       PWA / Admin / Kitchen / Motoboy panels / PDV              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    logistics-api (axum)                         │   │
//! │  │    /delivery/quote, /delivery/eta, /orders, /cash/sessions      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ entrega-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌───────┐ ┌──────────┐ ┌──────┐ ┌───────┐ ┌──────┐ ┌───────┐ │   │
//! │  │  │ money │ │ geo      │ │ eta  │ │ order │ │ cash │ │ zone  │ │   │
//! │  │  │       │ │ delivery │ │      │ │       │ │      │ │       │ │   │
//! │  │  └───────┘ └──────────┘ └──────┘ └───────┘ └──────┘ └───────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  entrega-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer centavos (no floating point!)
//! - [`geo`] - Coordinates and Haversine distance
//! - [`delivery`] - Tiered delivery fee calculation and quotes
//! - [`zone`] - Delivery zones and establishment defaults
//! - [`eta`] - Prep + travel time estimation
//! - [`order`] - Orders, totals, change and the status lookup table
//! - [`cash`] - Cash register sessions and reconciliation
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use entrega_core::delivery::{calculate_fee, DeliveryFeeRule};
//! use entrega_core::geo::Distance;
//! use entrega_core::money::Money;
//!
//! let rule = DeliveryFeeRule::new(Money::from_cents(500), 3.0, Money::from_cents(150));
//!
//! // Inside the included radius: base fee only
//! assert_eq!(calculate_fee(&rule, Distance::from_km(2.0)).cents(), 500);
//!
//! // 5 km = 2 km beyond the radius at R$ 1,50/km
//! assert_eq!(calculate_fee(&rule, Distance::from_km(5.0)).cents(), 800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cash;
pub mod delivery;
pub mod error;
pub mod eta;
pub mod geo;
pub mod money;
pub mod order;
pub mod validation;
pub mod zone;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cash::{
    CashRegisterSession, CashTransaction, Reconciliation, ReconciliationStatus, SessionStatus,
    SessionSummary, TransactionKind,
};
pub use delivery::{DeliveryFeeRule, DeliveryQuote};
pub use error::{CoreError, CoreResult, ValidationError};
pub use eta::{EtaConfig, EtaEstimate, PeakWindow, TravelSource};
pub use geo::{Coordinates, Distance};
pub use money::Money;
pub use order::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, OrderTotals, OrderType, PaymentMethod,
};
pub use zone::{DeliveryTerms, DeliveryZone, EstablishmentDefaults, FeePolicy, NewZone};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed in a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Guards against typing 1000 instead of 10 at the PDV.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest amount accepted for a price, discount or cash movement
/// (R$ 10.000.000,00).
pub const MAX_MONEY_CENTS: i64 = 1_000_000_000;

/// Mean Earth radius used by the Haversine formula, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
