use thiserror::Error as ThisError;

use crate::rendering::streaming::RegionId;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("{0}")]
    Failed(String),
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Failed(msg) => msg,
        }
    }
}

impl From<String> for ComponentError {
    fn from(e: String) -> Self {
        Self::Failed(e)
    }
}

impl From<&str> for ComponentError {
    fn from(e: &str) -> Self {
        Self::Failed(e.to_string())
    }
}

impl From<serde_json::Error> for ComponentError {
    fn from(e: serde_json::Error) -> Self {
        Self::Failed(format!("value could not be deserialized: {e}"))
    }
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("component `{component}` failed: {source}")]
    Component { component: String, source: ComponentError },

    #[error("suspense region {id} failed: {source}")]
    Region { id: RegionId, source: Box<RenderError> },

    #[error("suspense region {0} timed out after {1}ms")]
    RegionTimeout(RegionId, u64),

    #[error("suspense region {0} was never allocated")]
    UnknownRegion(RegionId),

    #[error("suspense region {0} has already been flushed")]
    RegionFlushed(RegionId),

    #[error("suspense region {0} already has a gate")]
    GateAlreadyRegistered(RegionId),

    #[error("stream closed while {0} suspense regions were still pending")]
    PendingRegions(usize),

    #[error("stream is no longer writable")]
    StreamClosed,

    #[error("suspense task did not complete: {0}")]
    TaskAborted(String),
}

impl RenderError {
    pub fn component(component: impl Into<String>, source: ComponentError) -> Self {
        Self::Component { component: component.into(), source }
    }

    pub fn region(id: RegionId, source: RenderError) -> Self {
        Self::Region { id, source: Box::new(source) }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Component { .. } => "COMPONENT_ERROR",
            Self::Region { .. } => "REGION_ERROR",
            Self::RegionTimeout(_, _) => "REGION_TIMEOUT",
            Self::UnknownRegion(_) => "UNKNOWN_REGION",
            Self::RegionFlushed(_) => "REGION_FLUSHED",
            Self::GateAlreadyRegistered(_) => "GATE_ALREADY_REGISTERED",
            Self::PendingRegions(_) => "PENDING_REGIONS",
            Self::StreamClosed => "STREAM_CLOSED",
            Self::TaskAborted(_) => "TASK_ABORTED",
        }
    }

    /// The innermost error, looking through region wrappers.
    pub fn root_cause(&self) -> &RenderError {
        match self {
            Self::Region { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config file: {0}")]
    FileRead(std::io::Error),

    #[error("Failed to write config file: {0}")]
    FileWrite(std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(toml::ser::Error),
}
