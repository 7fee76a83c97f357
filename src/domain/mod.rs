//! Domain layer public interface.
//!
//! This module defines domain-level abstractions that are independent of
//! transport implementations or socket libraries.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod connection;

// --- Connection domain re-exports ---

pub use connection::{
    //
    Connection,
    ConnectionPtr,
    SendFlags,
};
