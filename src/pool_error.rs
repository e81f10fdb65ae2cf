//! Top-level error of the pool workflows.

use crate::pool_client::ClientError;
use crate::pool_prompt::PromptError;
use crate::pool_validate::ValidationError;

/// Any failure of a `create`, `list`, `describe` or `delete` run.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Flag-compatibility or input-format error.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The user could not be asked, or gave up.
    #[error("{context}: {source}")]
    Prompt {
        /// What was being asked.
        context: String,
        /// Underlying prompt failure.
        source: PromptError,
    },

    /// Control-plane or cloud call failed.
    #[error("{context}: {source}")]
    Api {
        /// Operation and cluster.
        context: String,
        /// Underlying client failure.
        source: ClientError,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(ClientError),

    #[error("required flag \"--cluster\" not set (or export POOLCTL_CLUSTER)")]
    MissingCluster,

    /// Cluster key is not a safe identifier.
    #[error("Cluster name, identifier or external identifier '{0}' isn't valid: it must contain only letters, digits, dashes and underscores")]
    InvalidClusterKey(String),

    #[error("There is no cluster with identifier or name '{0}'")]
    ClusterNotFound(String),

    #[error("Cluster '{0}' is not yet ready")]
    ClusterNotReady(String),

    /// Pool identifier given to `describe` or `delete` is malformed.
    #[error("Expected a valid identifier for the machine pool: '{0}'")]
    InvalidPoolId(String),

    #[error("Machine pool '{0}' not found")]
    PoolNotFound(String),

    #[error("Machine pool '{id}' does not exist for hosted cluster '{cluster}'")]
    NodePoolNotFound {
        /// Pool ID.
        id: String,
        /// Cluster key as given by the user.
        cluster: String,
    },

    /// Rendering JSON output failed.
    #[error("Unable to print machine pool: {0}")]
    Output(#[from] serde_json::Error),

    /// Writing output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl PoolError {
    /// `map_err` adapter wrapping a client error with context.
    pub fn api(context: impl Into<String>) -> impl FnOnce(ClientError) -> Self {
        let context = context.into();
        move |source| Self::Api { context, source }
    }

    /// `map_err` adapter wrapping a prompt error with context.
    pub fn prompt(context: impl Into<String>) -> impl FnOnce(PromptError) -> Self {
        let context = context.into();
        move |source| Self::Prompt { context, source }
    }
}
