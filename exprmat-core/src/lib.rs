//! Shared primitives for the exprmat expression-matrix engine.
//!
//! `exprmat-core` is the foundation the model and matrix crates build on:
//!
//! - **Error types**: [`ExprMatError`] and [`Result`] for structured error handling
//! - **Traits**: [`Named`] and [`Summarizable`]
//! - **Bit vectors**: [`BitVec`], the backing store for mask grids

pub mod bitvec;
pub mod error;
pub mod traits;

pub use bitvec::BitVec;
pub use error::{ExprMatError, Result};
pub use traits::*;
