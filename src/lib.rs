//! Mortar compiles selections, mutations and bulk commands into parameterized SQL.
//!
//! This crate re-exports [`mortar_core`]; the dialect lives in a driver crate such as
//! `mortar-mssql`.
pub use mortar_core::*;
