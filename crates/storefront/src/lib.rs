//! Bazaar Storefront library.
//!
//! Client-side storefront over a third-party REST API. The remote API owns all
//! authoritative state; this crate keeps an in-memory cache of the signed-in
//! user's cart, wishlist and address book, gates protected operations on a
//! persisted session token, and derives filtered, paginated catalog views.
//!
//! # Layers
//!
//! - [`api`] - HTTP client wrapper, typed resource services, and the
//!   normalization boundary that maps upstream response variants into one
//!   canonical shape
//! - [`session`] - Persisted session token (cookie + local store) and
//!   storage-change notifications
//! - [`auth`] - Auth gate, route guards, and sign-in/sign-out flows
//! - [`cache`] - Cart, wishlist and address book cache providers
//! - [`catalog`] - Product filtering, sorting, pagination and rankings
//! - [`checkout`] - Display-only order summary and order placement
//! - [`state`] - The [`Storefront`](state::Storefront) container tying it together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod validation;

pub use error::{AppError, Result};
pub use state::Storefront;
