//! Vote percentages and results-overlay geometry.

/// Percentage validation, generation and bar layout.
pub mod percentages;
