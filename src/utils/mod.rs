//! # Utilities Module
//!
//! Path finding over the maze grid and weighted random selection.

pub mod random;
pub mod search;

pub use random::*;
pub use search::*;
