//! Image placement and caption anchoring for the two option slots.

/// Decode, scale and place both option images.
pub mod resolver;
