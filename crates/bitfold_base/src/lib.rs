//! # bitfold-base
//!
//! Structural atoms for the bitfold workspace.
//!
//! This crate provides the foundational types used throughout bitfold:
//!
//! - [`Span`] — byte-offset source locations
//! - [`SpannedError`]/[`Result`] — errors with source positions
//!
//! It has no knowledge of BV syntax or synthesis; higher-level crates
//! build on these pieces.

pub mod error;
pub mod span;

pub use error::{Result, SpannedError};
pub use span::Span;
