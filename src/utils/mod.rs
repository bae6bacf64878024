//! Shared limits and small parsing helpers.

pub mod validation;
