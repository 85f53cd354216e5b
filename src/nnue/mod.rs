//! The efficiently updatable neural network that evaluates positions.

pub mod accumulator;
pub mod network;
pub mod simd;
