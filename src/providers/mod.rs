/*!
 * Translation client backends shipped with the binary.
 *
 * - `original`: copies the source text through unchanged
 * - `mock`: deterministic dry-run client, also used by the test suite
 *
 * Model-backed clients implement `TranslationClient` directly.
 */

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::translation::{PassthroughClient, TranslationClient};

pub mod mock;

/// Backend selected in the configuration or on the command line
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Original,
    Mock,
}

impl Backend {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Original => "Original (passthrough)",
            Self::Mock => "Mock",
        }
    }

    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Original => "original".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid backend: {}", s)),
        }
    }
}

/// Instantiate the client for `backend`
pub fn create_client(backend: Backend) -> Arc<dyn TranslationClient> {
    match backend {
        Backend::Original => Arc::new(PassthroughClient),
        Backend::Mock => Arc::new(mock::MockClient::working()),
    }
}
