//! Tracing and reverse-mode differentiation of elementwise functions.
//!
//! Functions are traced into a [`ir::Jaxpr`], a flat listing of the
//! primitives they apply, and can be transformed into functions computing
//! their gradients, which are traceable in the same way.

pub mod error;
pub mod function;
pub mod grad;
pub mod ir;
pub mod ops;
pub mod shape;
pub mod tensor;
pub mod trace;
pub mod var;
