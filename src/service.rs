//! Contract with the external inpainting service.
//!
//! The transport (HTTP, auth tokens, retries) belongs to the implementor of
//! [`InpaintService`]; this module fixes the request fields and reply shapes.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Image,
    Mask,
}

impl UploadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadKind::Image => "image",
            UploadKind::Mask => "mask",
        }
    }
}

/// One multipart upload: the `file` part plus the `md5` and `type` form fields.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub fingerprint: String,
    pub kind: UploadKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn image(fingerprint: &str, bytes: Vec<u8>) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            kind: UploadKind::Image,
            file_name: "image".to_string(),
            bytes,
        }
    }

    /// The service recognises masks by a file name containing "mask".
    pub fn mask(fingerprint: &str, png: Vec<u8>) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            kind: UploadKind::Mask,
            file_name: "mask.png".to_string(),
            bytes: png,
        }
    }

    pub fn form_fields(&self) -> [(&'static str, &str); 2] {
        [("md5", self.fingerprint.as_str()), ("type", self.kind.as_str())]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub message: String,
}

impl Reply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: message.into(),
        }
    }

    /// The message on success, `ServiceError::Remote` otherwise.
    pub fn into_result(self) -> Result<String, ServiceError> {
        match self.status {
            ReplyStatus::Success => Ok(self.message),
            ReplyStatus::Error => Err(ServiceError::Remote(self.message)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl UploadReply {
    pub fn into_result(self) -> Result<UploadReply, ServiceError> {
        match self.status {
            ReplyStatus::Success => Ok(self),
            ReplyStatus::Error => Err(ServiceError::Remote(self.message)),
        }
    }
}

/// JSON body of submit, delete and reprocess requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerprintBody {
    pub md5: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Processing)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub status: TaskStatus,
    /// Unix seconds.
    pub create_time: f64,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub progress: f32,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    pub tasks: HashMap<String, TaskRecord>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

pub trait InpaintService: Send + Sync {
    fn upload(&self, request: &UploadRequest) -> Result<UploadReply, ServiceError>;
    fn submit(&self, fingerprint: &str) -> Result<Reply, ServiceError>;
    fn list_tasks(&self, page: u32) -> Result<TaskPage, ServiceError>;
    fn delete_task(&self, fingerprint: &str) -> Result<Reply, ServiceError>;
    fn reprocess(&self, fingerprint: &str) -> Result<Reply, ServiceError>;
    fn fetch_image(&self, fingerprint: &str) -> Result<Vec<u8>, ServiceError>;
    /// `None` when no mask was ever stored for the task.
    fn fetch_mask(&self, fingerprint: &str) -> Result<Option<Vec<u8>>, ServiceError>;
    /// The inpainted image, `None` until processing has produced it.
    fn fetch_result(&self, fingerprint: &str) -> Result<Option<Vec<u8>>, ServiceError>;
}

/// Maps an HTTP status and body onto a typed reply, for transport implementors.
pub fn decode_reply<T: DeserializeOwned>(status_code: u16, body: &[u8]) -> Result<T, ServiceError> {
    match status_code {
        401 | 403 => Err(ServiceError::Unauthorized),
        200..=299 => Ok(serde_json::from_slice(body)?),
        other => Err(ServiceError::Transport(format!("HTTP status {other}"))),
    }
}
