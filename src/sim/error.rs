//! Error type shared by every fallible scene operation

use glam::Vec2;
use thiserror::Error;

use super::node::NodeId;

/// Why a scene operation was refused
///
/// Errors abort the single construction or mutation that raised them; the
/// rest of the frame carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// The handle does not resolve to a registered node (freed or never created)
    #[error("node {0} is not registered")]
    StaleNode(NodeId),
    /// A node kind that needs a shape was configured without one
    #[error("{kind} requires a shape")]
    MissingShape { kind: &'static str },
    /// Negative or non-finite shape extents
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    /// Attaching `child` under `parent` would close a loop in the hierarchy
    #[error("cannot parent {child} under {parent}: it is the node itself or one of its descendants")]
    CyclicParent { child: NodeId, parent: NodeId },
    /// NaN or infinity assigned to a simulated quantity
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    /// Time step that is negative or not finite
    #[error("invalid time delta {0}")]
    InvalidDelta(f32),
    /// The operation needs a different node kind
    #[error("node {id} is not a {expected}")]
    WrongKind { id: NodeId, expected: &'static str },
    /// Typed payload is missing or of another type
    #[error("node {id} has no payload of type {expected}")]
    PayloadType { id: NodeId, expected: &'static str },
    /// No factory registered under this type tag
    #[error("no factory registered for type tag '{0}'")]
    UnknownType(String),
    /// Importer record that does not deserialize into a spawn request
    #[error("malformed spawn request: {0}")]
    InvalidRequest(String),
    /// Name already taken and the policy rejects duplicates
    #[error("node name '{0}' is already in use")]
    DuplicateName(String),
    /// A lifecycle pass was started from inside another pass
    #[error("lifecycle pass started while another pass is running")]
    ReentrantPass,
    /// Settings failed to parse or validate
    #[error("invalid settings: {0}")]
    Settings(String),
}

/// Reject NaN and infinities before they reach the simulation state
#[inline]
pub fn ensure_finite(value: Vec2, field: &'static str) -> Result<Vec2, SimError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::NonFinite { field })
    }
}

/// Validate a frame delta: finite and not negative
#[inline]
pub fn ensure_delta(dt: f32) -> Result<f32, SimError> {
    if dt.is_finite() && dt >= 0.0 {
        Ok(dt)
    } else {
        Err(SimError::InvalidDelta(dt))
    }
}
