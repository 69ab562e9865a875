//! # Repository Module
//!
//! Database repository implementations for Orderflow.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Engine workflow                                                       │
//! │       │                                                                 │
//! │       │  db.products().reserve_stock(&id, qty)                         │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── reserve_stock(&self, id, qty)                                     │
//! │  └── release_stock(&self, id, qty)                                     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • The atomicity-sensitive statements live next to their docs          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog lookup + stock ledger
//! - [`cart::CartRepository`] - Cart and cart-line operations
//! - [`order::OrderRepository`] - Orders, frozen lines, status history
//! - [`payment::PaymentRepository`] - Payment records (one per order)

pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
