//! In-process storage.

pub mod accounts;
