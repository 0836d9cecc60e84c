use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("No pools found in lake at {url}")]
    NoPools { url: String },

    #[error("Pool must be specified in \"From\". Available pools in lake at {url}: {}", .pools.join(", "))]
    MissingPool { url: String, pools: Vec<String> },

    #[error("More than one shape detected (consider using \"cut\" or \"fuse\")")]
    MultipleShapes,

    #[error("Time Field \"{time_field}\" must be Zed <time> type, but detected type(s): {}", .detected.join(", "))]
    TimeFieldType {
        time_field: String,
        detected: Vec<String>,
    },

    #[error("Fatal error - {0} (please open an issue at https://github.com/brimdata/grafana-zed-datasource/issues)")]
    MalformedResponse(String),

    #[error("Could not reach Zed lake at {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Query error: {0}")]
    Engine(String),

    #[error("Frame error: {0}")]
    Frame(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DatasourceError {
    /// Defects in this crate or in the engine's response, as opposed to
    /// conditions the user can fix by editing the query.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            DatasourceError::MalformedResponse(_) | DatasourceError::Internal(_)
        )
    }

    pub(crate) fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        DatasourceError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasourceError>;
