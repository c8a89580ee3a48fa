//! Betting strategy.
//!
//! Pure decision logic with no I/O:
//! - `frequency`: first-occurrence arg max / arg min
//! - `doubles`: choosing which fixtures get a double and with which sign

pub mod doubles;
pub mod frequency;

pub use doubles::{DoubleSelection, DoubleSelector};
