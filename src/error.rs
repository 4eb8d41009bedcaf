//! Error types for kinematics and dynamics queries.

use std::fmt;

use thiserror::Error;

/// Result type for kinematics operations.
pub type KinematicsResult<T> = Result<T, KinematicsError>;

/// A piece of cached state that a query depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// A configuration vector passed to `KinematicsCache::initialize`.
    Configuration,
    /// Transforms and motion subspaces from a forward kinematics pass.
    PositionKinematics,
    /// Twists from a forward kinematics pass that was given a velocity vector.
    VelocityKinematics,
    /// Bias accelerations (Jdot times v).
    JdotV,
}

impl Requirement {
    /// The call that produces the missing state.
    pub fn remedy(&self) -> &'static str {
        match self {
            Requirement::Configuration => "KinematicsCache::initialize",
            Requirement::PositionKinematics => "do_kinematics",
            Requirement::VelocityKinematics => "do_kinematics with a velocity vector",
            Requirement::JdotV => {
                "do_kinematics with a velocity vector and compute_jdotv set to true"
            }
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Configuration => write!(f, "a configuration vector, which has not been set"),
            Requirement::PositionKinematics => {
                write!(f, "position kinematics, which have not been cached")
            }
            Requirement::VelocityKinematics => {
                write!(f, "velocity kinematics, which have not been cached")
            }
            Requirement::JdotV => write!(f, "Jdot times v, which has not been cached"),
        }
    }
}

/// Errors that can occur when building a tree or querying a kinematics cache.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    /// A supplied vector or matrix has the wrong size.
    #[error("{what} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        /// What was being checked (e.g. "q").
        what: &'static str,
        /// Dimension the tree expects.
        expected: usize,
        /// Dimension that was supplied.
        actual: usize,
    },

    /// A query needs cached state that was never computed or was invalidated.
    #[error("{method} requires {requirement}. Please call {}.", .requirement.remedy())]
    NotReady {
        /// Name of the operation that was called.
        method: &'static str,
        /// The missing piece of state.
        requirement: Requirement,
    },

    /// The cache holds no velocity vector.
    #[error("kinematics cache has no valid velocity vector")]
    NoVelocity,

    /// Body index outside the tree.
    #[error("body index {0} is not part of this tree")]
    UnknownBody(usize),

    /// Frame index outside the tree.
    #[error("frame index {0} is not part of this tree")]
    UnknownFrame(usize),

    /// No body with the given name.
    #[error("no body named {0}")]
    UnknownBodyName(String),

    /// No frame with the given name.
    #[error("no frame named {0}")]
    UnknownFrameName(String),

    /// The cache was constructed against a different tree.
    #[error("cache does not belong to this tree: {what} is {cache} in the cache but {tree} in the tree")]
    CacheTreeMismatch {
        /// The quantity that differs (e.g. "bodies").
        what: &'static str,
        /// Value in the cache.
        cache: usize,
        /// Value in the tree.
        tree: usize,
    },

    /// A transform, wrench or inertia is labelled with the wrong frame.
    #[error("frame mismatch: expected {expected}, got {actual}")]
    FrameMismatch {
        /// Expected frame name.
        expected: String,
        /// Actual frame name.
        actual: String,
    },

    /// A body or frame name is already taken.
    #[error("name {0} is already used by a body or frame")]
    DuplicateName(String),

    /// A parent index that does not refer to an existing body.
    #[error("parent index {parent} is invalid for a tree with {num_bodies} bodies")]
    InvalidParent {
        /// The requested parent.
        parent: usize,
        /// Number of bodies currently in the tree.
        num_bodies: usize,
    },

    /// The joint-space mass matrix could not be factored.
    #[error("mass matrix is singular")]
    SingularMassMatrix,
}

impl KinematicsError {
    /// Creates a dimension mismatch error.
    #[must_use]
    pub const fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    /// Creates a frame mismatch error.
    #[must_use]
    pub fn frame_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::FrameMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
