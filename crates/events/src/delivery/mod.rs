//! Delivery of engine output to systems outside the process.

pub mod gateway;
