//! Wire models for the Capucho update service.
//!
//! Only JSON shapes live here; transport is the caller's concern.

pub mod models;
