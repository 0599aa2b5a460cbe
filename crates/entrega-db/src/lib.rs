//! # entrega-db: Database Layer for Entrega
//!
//! SQLite persistence for orders, delivery zones, establishment settings
//! and cash register sessions, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Entrega Data Flow                                │
//! │                                                                         │
//! │  logistics-api handler (POST /orders)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    entrega-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ OrderRepo      │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CashRegister   │   │ 001_initial  │  │   │
//! │  │   │               │    │ ZoneRepo       │   │ _schema.sql  │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Orders, cash register, zones
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entrega_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./entrega.db")).await?;
//!
//! let active = db.orders().list_active().await?;
//! let session = db.cash_register().current_session("caixa-01").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cash_register::CashRegisterRepository;
pub use repository::order::{CreateOrder, OrderRepository};
pub use repository::zone::ZoneRepository;
