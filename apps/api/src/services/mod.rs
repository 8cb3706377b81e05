//! Request-spanning workflows.

pub mod order_numbers;
pub mod order_update;
