//! Error types for Pitlane.
//!
//! Every failure the host can report is a variant of [`PitlaneError`]. Each
//! variant carries the module URL it concerns and a stable error code so
//! that orchestrators can branch on the code rather than on message text.

use thiserror::Error;

/// The main error type for Pitlane operations.
#[derive(Error, Debug)]
pub enum PitlaneError {
    // =========================================================================
    // Transport Errors (E100-E199)
    // =========================================================================
    /// Retrieving the module bytes failed.
    #[error("E101: Failed to fetch module '{url}': {cause}")]
    Fetch {
        /// The module URL.
        url: String,
        /// Reason for the failure (transport error or HTTP status).
        cause: String,
    },

    // =========================================================================
    // Load Errors (E200-E299)
    // =========================================================================
    /// The bytes are not a valid module for the execution engine.
    #[error("E201: Failed to compile module '{url}': {cause}")]
    Compile {
        /// The module URL.
        url: String,
        /// Compiler diagnostic.
        cause: String,
    },

    /// Import resolution failed or the start function trapped.
    #[error("E202: Failed to instantiate module '{url}': {cause}")]
    Instantiate {
        /// The module URL.
        url: String,
        /// Linker or trap diagnostic.
        cause: String,
    },

    // =========================================================================
    // Adapter Errors (E300-E399)
    // =========================================================================
    /// None of the recognised ABI variants is fully exported.
    #[error("E301: Module '{url}' exports no recognised decision ABI: {cause}")]
    MissingExports {
        /// The module URL.
        url: String,
        /// What was found instead.
        cause: String,
    },

    /// `decide` was called before initialization completed or after dispose.
    #[error("E302: Decision module '{url}' is not initialized")]
    NotInitialized {
        /// The module URL.
        url: String,
    },

    /// A module instance was handed to a second adapter.
    #[error("E303: Module instance '{url}' is already wrapped by an adapter")]
    AlreadyWrapped {
        /// The module URL.
        url: String,
    },

    // =========================================================================
    // Execution Errors (E400-E499)
    // =========================================================================
    /// The foreign call trapped, ran out of fuel, or touched memory out of bounds.
    #[error("E401: Decision module '{url}' trapped: {cause}")]
    ForeignTrap {
        /// The module URL.
        url: String,
        /// Trap diagnostic.
        cause: String,
    },

    // =========================================================================
    // Registry Errors (E500-E599)
    // =========================================================================
    /// No module was registered under this name.
    #[error("E501: No decision module registered as '{name}'")]
    UnknownModule {
        /// The requested alias.
        name: String,
    },

    // =========================================================================
    // Host Errors (E600-E699)
    // =========================================================================
    /// Configuration could not be parsed or is inconsistent.
    #[error("E601: Invalid configuration: {cause}")]
    Config {
        /// Description of the problem.
        cause: String,
    },

    /// The execution engine or host import surface could not be set up.
    #[error("E602: Runtime setup failed for '{component}': {cause}")]
    Runtime {
        /// Engine component that failed (e.g. "engine", "fd_write").
        component: String,
        /// Underlying error.
        cause: String,
    },
}

impl PitlaneError {
    /// Get the error code (e.g., "E101").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "E101",
            Self::Compile { .. } => "E201",
            Self::Instantiate { .. } => "E202",
            Self::MissingExports { .. } => "E301",
            Self::NotInitialized { .. } => "E302",
            Self::AlreadyWrapped { .. } => "E303",
            Self::ForeignTrap { .. } => "E401",
            Self::UnknownModule { .. } => "E501",
            Self::Config { .. } => "E601",
            Self::Runtime { .. } => "E602",
        }
    }

    /// Check if retrying the same request could plausibly succeed.
    ///
    /// The core never retries on its own; this is a hint for orchestrators.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Check if the error is attributable to the module itself.
    #[must_use]
    pub fn is_module_fault(&self) -> bool {
        matches!(
            self,
            Self::Compile { .. }
                | Self::Instantiate { .. }
                | Self::MissingExports { .. }
                | Self::ForeignTrap { .. }
        )
    }

    /// The module URL this error concerns, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Fetch { url, .. }
            | Self::Compile { url, .. }
            | Self::Instantiate { url, .. }
            | Self::MissingExports { url, .. }
            | Self::NotInitialized { url }
            | Self::AlreadyWrapped { url }
            | Self::ForeignTrap { url, .. } => Some(url),
            Self::UnknownModule { .. } | Self::Config { .. } | Self::Runtime { .. } => None,
        }
    }
}

/// Result type alias using `PitlaneError`.
pub type Result<T> = std::result::Result<T, PitlaneError>;
