//! Common utilities for the experiment binaries and the test suite.
//!
//! - **`synthetic`**: seeded generators for banded, diagonally dominant orbital
//!   Hessians (sparse and dense) with matching gradients, and for nearly parallel
//!   trial vectors that stress the conditioning of the reduced problem.

pub mod synthetic;
