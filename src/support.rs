//! Supporting utilities used throughout the crate.
//!
//! These modules are public because they're useful on their own, but their
//! APIs are not stable.

pub mod positive;
pub mod units;
