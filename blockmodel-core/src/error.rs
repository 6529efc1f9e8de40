//! Error types for the blockmodel core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::fmt;

use thiserror::Error;

/// Stable codes describing [`SamplerError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum SamplerErrorCode {
    /// A draw was requested from an empty range or sequence.
    EmptyRange,
    /// Weighted choice received negative, non-finite, or all-zero weights.
    InvalidWeights,
}

impl SamplerErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyRange => "SAMPLER_EMPTY_RANGE",
            Self::InvalidWeights => "SAMPLER_INVALID_WEIGHTS",
        }
    }
}

impl fmt::Display for SamplerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error produced by [`Sampler`](crate::Sampler) operations.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SamplerError {
    /// A draw was requested from an empty range or sequence.
    #[error("cannot draw from an empty range")]
    EmptyRange,
    /// Weighted choice received negative, non-finite, or all-zero weights.
    #[error("weights must be non-negative, finite, and sum to a positive value")]
    InvalidWeights,
}

impl SamplerError {
    /// Retrieve the stable [`SamplerErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> SamplerErrorCode {
        match self {
            Self::EmptyRange => SamplerErrorCode::EmptyRange,
            Self::InvalidWeights => SamplerErrorCode::InvalidWeights,
        }
    }
}

/// Stable codes describing [`NetworkError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum NetworkErrorCode {
    /// A node lookup by id and level missed.
    UnknownNode,
    /// A type name was not registered at network construction.
    UnknownType,
    /// A level index exceeded the number of levels in the network.
    LevelOutOfRange,
    /// A parent/child pair violated the one-level-apart discipline.
    LevelMismatch,
    /// A parent/child pair had different node types.
    TypeMismatch,
    /// An edge connected a type pair excluded by the whitelist.
    ForbiddenEdgeType,
    /// Block initialization requested more blocks than available children.
    TooManyBlocks,
    /// A merge step found fewer than two blocks for a populated type.
    InsufficientBlocks,
    /// An ancestor walk left the hierarchy before reaching the target level.
    NoSuchAncestor,
    /// Entropy or state was requested without a block layer present.
    StateUnavailable,
    /// The network's sampler was misused.
    Sampler,
}

impl NetworkErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownNode => "NETWORK_UNKNOWN_NODE",
            Self::UnknownType => "NETWORK_UNKNOWN_TYPE",
            Self::LevelOutOfRange => "NETWORK_LEVEL_OUT_OF_RANGE",
            Self::LevelMismatch => "NETWORK_LEVEL_MISMATCH",
            Self::TypeMismatch => "NETWORK_TYPE_MISMATCH",
            Self::ForbiddenEdgeType => "NETWORK_FORBIDDEN_EDGE_TYPE",
            Self::TooManyBlocks => "NETWORK_TOO_MANY_BLOCKS",
            Self::InsufficientBlocks => "NETWORK_INSUFFICIENT_BLOCKS",
            Self::NoSuchAncestor => "NETWORK_NO_SUCH_ANCESTOR",
            Self::StateUnavailable => "NETWORK_STATE_UNAVAILABLE",
            Self::Sampler => "NETWORK_SAMPLER",
        }
    }
}

impl fmt::Display for NetworkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type produced by [`Network`](crate::Network) operations and the
/// MCMC / merge drivers built on top of it.
///
/// Every variant is fatal to the call that raised it; the network is left
/// unchanged when construction or validation fails.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum NetworkError {
    /// A node lookup by id and level missed.
    #[error("node `{id}` does not exist at level {level}")]
    UnknownNode { id: String, level: usize },
    /// A type name was not registered at network construction.
    #[error("type `{name}` does not exist in the network")]
    UnknownType { name: String },
    /// A level index exceeded the number of levels in the network.
    #[error("level {level} is out of range for a network with {num_levels} levels")]
    LevelOutOfRange { level: usize, num_levels: usize },
    /// A node was at the wrong level for the requested operation.
    #[error("expected a node at level {expected}, found level {found}")]
    LevelMismatch { expected: usize, found: usize },
    /// A parent/child pair had different node types.
    #[error("parent of type `{parent_type}` cannot adopt a child of type `{child_type}`")]
    TypeMismatch {
        child_type: String,
        parent_type: String,
    },
    /// An edge connected a type pair excluded by the whitelist.
    #[error("edges between types `{from}` and `{to}` are not allowed")]
    ForbiddenEdgeType { from: String, to: String },
    /// Block initialization requested more blocks than available children.
    #[error(
        "cannot initialize {requested} blocks for type `{node_type}` with {available} children"
    )]
    TooManyBlocks {
        requested: usize,
        available: usize,
        node_type: String,
    },
    /// A merge step found fewer than two blocks for a populated type.
    #[error("type `{node_type}` has {found} blocks; merging requires at least two")]
    InsufficientBlocks { node_type: String, found: usize },
    /// An ancestor walk left the hierarchy before reaching the target level.
    #[error("node `{id}` at level {level} has no ancestor at level {requested}")]
    NoSuchAncestor {
        id: String,
        level: usize,
        requested: usize,
    },
    /// Entropy or state was requested without a block layer present.
    #[error("no block layer exists above level {level}")]
    StateUnavailable { level: usize },
    /// The network's sampler was misused.
    #[error("sampler failure: {0}")]
    Sampler(#[from] SamplerError),
}

impl NetworkError {
    /// Retrieve the stable [`NetworkErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> NetworkErrorCode {
        match self {
            Self::UnknownNode { .. } => NetworkErrorCode::UnknownNode,
            Self::UnknownType { .. } => NetworkErrorCode::UnknownType,
            Self::LevelOutOfRange { .. } => NetworkErrorCode::LevelOutOfRange,
            Self::LevelMismatch { .. } => NetworkErrorCode::LevelMismatch,
            Self::TypeMismatch { .. } => NetworkErrorCode::TypeMismatch,
            Self::ForbiddenEdgeType { .. } => NetworkErrorCode::ForbiddenEdgeType,
            Self::TooManyBlocks { .. } => NetworkErrorCode::TooManyBlocks,
            Self::InsufficientBlocks { .. } => NetworkErrorCode::InsufficientBlocks,
            Self::NoSuchAncestor { .. } => NetworkErrorCode::NoSuchAncestor,
            Self::StateUnavailable { .. } => NetworkErrorCode::StateUnavailable,
            Self::Sampler(_) => NetworkErrorCode::Sampler,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, NetworkError>;
