//! Render job request and response.
//!
//! These are the values exchanged with whatever schedules renders (a CLI,
//! a job queue, an RPC service). The renderer only needs the request's
//! numbers; how a request arrives is not its concern.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors found when validating a job request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Invalid render job: {0}")]
    Invalid(String),
}

/// Parameters of one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderJobRequest {
    /// Scene description to load.
    pub scene_file: String,
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    /// Worker threads; 0 picks one per core.
    #[serde(default)]
    pub num_threads: u32,
    pub max_depth: u32,
    /// Where the deep image is written.
    pub output_target: String,
    /// Optional label used only in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_name: Option<String>,
}

impl RenderJobRequest {
    /// Reject requests that cannot produce an image.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.width == 0 || self.height == 0 {
            return Err(JobError::Invalid(format!(
                "image size {}x{} has no pixels",
                self.width, self.height
            )));
        }
        if self.samples_per_pixel == 0 {
            return Err(JobError::Invalid("samples per pixel must be nonzero".into()));
        }
        if self.max_depth == 0 {
            return Err(JobError::Invalid("max depth must be nonzero".into()));
        }
        if self.output_target.trim().is_empty() {
            return Err(JobError::Invalid("output target is empty".into()));
        }
        Ok(())
    }
}

/// Outcome of one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderJobResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl RenderJobResponse {
    pub fn succeeded(output_uri: impl Into<String>) -> Self {
        Self {
            success: true,
            output_uri: Some(output_uri.into()),
            error_msg: None,
        }
    }

    pub fn failed(error_msg: impl Into<String>) -> Self {
        Self {
            success: false,
            output_uri: None,
            error_msg: Some(error_msg.into()),
        }
    }
}
