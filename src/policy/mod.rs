//! Policy layer.

pub mod access;
