/// Type-state markers for the builder pattern
///
/// These types track at compile time whether a connection target has been
/// set, so `connect()` only exists on a builder that knows where to dial.

/// Marker trait for target state
pub trait TargetState {}

/// Target has not been set
pub struct NoTarget;
impl TargetState for NoTarget {}

/// Target has been set
pub struct HasTarget;
impl TargetState for HasTarget {}
