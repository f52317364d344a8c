//! The moving parts of the test pattern.

pub mod color_cycle;
pub mod grad_box;
