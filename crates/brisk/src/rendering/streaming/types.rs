use serde::Serialize;
use std::fmt;

use super::constants::{CONTENT_ID_PREFIX, FALLBACK_ID_PREFIX, SCRIPT_ID_PREFIX};

/// Suspense region address, unique within one render and assigned from 1 upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegionId(u32);

impl RegionId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn fallback_id(self) -> String {
        format!("{FALLBACK_ID_PREFIX}{}", self.0)
    }

    pub fn content_id(self) -> String {
        format!("{CONTENT_ID_PREFIX}{}", self.0)
    }

    pub fn script_id(self) -> String {
        format!("{SCRIPT_ID_PREFIX}{}", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Pending,
    Flushed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Open,
    Closed,
    Errored,
}

#[derive(Debug, Clone)]
pub enum BufferedWrite {
    Open(String),
    Text(String),
    Close { name: String },
}

impl BufferedWrite {
    pub fn into_markup(self) -> String {
        match self {
            Self::Open(markup) => markup,
            Self::Text(text) => text,
            Self::Close { name } => format!("</{name}>"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub regions_allocated: usize,
    pub regions_flushed: usize,
    pub chunks_emitted: usize,
    pub bytes_emitted: usize,
}
