//! # Repository Module
//!
//! Database repositories for Entrega.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  db.orders().advance(id)                                       │
//! │       ▼                                                                 │
//! │  OrderRepository            CashRegisterRepository    ZoneRepository   │
//! │  ├── create                 ├── open_session          ├── list         │
//! │  ├── get_by_id / get_items  ├── record_transaction    ├── create       │
//! │  ├── list_active            ├── summary               ├── update       │
//! │  ├── advance / cancel       └── close_session         └── defaults     │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business rules come from entrega-core; repositories check them inside the
//! same transaction as the write.

pub mod cash_register;
pub mod order;
pub mod zone;
