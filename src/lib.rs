//! `equipswap`: rule-driven equipment swapper
//!
//! Watches a running game through a [`hook::GameHook`] and rewrites
//! equipment identifiers when configured triggers fire. Temporary rewrites
//! are recorded per slot and reverted when the weapon is put away or the
//! world reloads.

pub mod cli;
pub mod config;
pub mod error;
pub mod hook;
pub mod monitor;
pub mod observability;
pub mod swap;
