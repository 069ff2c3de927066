//! Error types for snapshot fetching and shaping.

use thiserror::Error;

use crate::catalog::QueryId;

/// Result type alias for dashboard operations.
pub type Result<T> = std::result::Result<T, DashError>;

/// Errors scoped to the section (or query) they affect.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DashError {
    /// Remote source unreachable, non-success status, or malformed payload.
    #[error("fetch failed for {query}: {message}")]
    Fetch {
        query: QueryId,
        message: String,
    },

    /// An expected column is missing from a snapshot or shaped row.
    #[error("schema error: column `{column}` missing{}", context_suffix(.context))]
    Schema {
        column: String,
        context: Option<String>,
    },

    /// The snapshot holds zero rows where at least one is required.
    #[error("no data for {query}")]
    EmptyData { query: QueryId },

    /// Invalid catalog or environment configuration.
    #[error("config error: {message}")]
    Config { message: String },
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(ctx) => format!(" in {}", ctx),
        None => String::new(),
    }
}

impl DashError {
    pub fn fetch(query: QueryId, message: impl Into<String>) -> Self {
        Self::Fetch {
            query,
            message: message.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
            context: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Attach the query or section name to a schema error.
    pub fn in_context(self, ctx: impl Into<String>) -> Self {
        match self {
            Self::Schema { column, context: None } => Self::Schema {
                column,
                context: Some(ctx.into()),
            },
            other => other,
        }
    }

    /// Short machine-readable kind, used by renderers and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Schema { .. } => "schema",
            Self::EmptyData { .. } => "empty",
            Self::Config { .. } => "config",
        }
    }
}
