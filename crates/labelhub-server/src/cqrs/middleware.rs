//! Marker traits separating write requests from read requests

/// A request that changes state
pub trait Command {}

/// A request that only reads state
pub trait Query {}
