//! Traits connecting forward simulations to the retrieval engine.
//!
//! The solvers in `retrieval_oem` are generic over a single capability set,
//! `ForwardModel`. Anything that can map a candidate state to a predicted
//! measurement (and a Jacobian) can be retrieved against.

pub mod forward_model;
