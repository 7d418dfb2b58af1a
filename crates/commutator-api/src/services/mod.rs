//! Request-level workflows that sit between handlers and the library crates.

pub mod intake;
