//! # Explorer API
//!
//! *Read-only HTTP API over an indexed blockchain database.*
//!
//! Every list endpoint pages with keyset cursors: a page is requested with a
//! signed `take` (forward when positive, backward when negative) and the
//! opaque `cursor` returned by the previous page.

pub mod api;
pub mod model;
pub mod pagination;
pub mod rest;
pub mod store;
pub mod utils;
pub mod verifier;
