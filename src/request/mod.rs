//! Request boundary types delivered by the upload/collection layer.

/// `VideoRequest` and its parts.
pub mod model;
