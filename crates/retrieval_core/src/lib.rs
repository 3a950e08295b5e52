//! Core abstractions for atmospheric retrieval.
//!
//! This crate defines the interfaces shared between the inversion engine
//! (`retrieval_oem`) and the forward simulations that implement them:
//! - `ForwardModel`: the measurement-prediction interface consumed by the
//!   iterative solvers
//! - `LinearForwardModel`: a reference implementation for exactly linear
//!   forward operators
//!
//! Forward-model crates depend on this crate only; they never need to see
//! the solvers themselves.

pub mod traits;

pub use traits::forward_model::{ForwardModel, LinearForwardModel};
