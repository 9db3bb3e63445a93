//! Shared helpers for staging and packaging.

pub mod checksum;
pub mod fs;
