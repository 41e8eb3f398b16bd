//! Request protocol
//!
//! Requests and responses travel as JSON payloads inside
//! [`MessageEnvelope`]s. Every response carries the id of the request it
//! answers and its outcome as a `Result`, so an operation failure is a
//! normal reply, never a transport error.

use core_types::{NodeId, NodeKind, ServiceId};
use ipc::{ChannelId, MessageEnvelope, MessageId, MessagePayload, SchemaVersion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operations::{AttrField, ReadDir, ReaddirCursor};
use crate::FsWireError;

pub const FS_REQUEST_ACTION: &str = "memfs.request";
pub const FS_RESPONSE_ACTION: &str = "memfs.response";
pub const FS_SCHEMA_VERSION: SchemaVersion = SchemaVersion::new(1, 0);

/// Request wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsRequest {
    pub request_id: MessageId,
    /// Channel the response is sent to
    pub reply_to: ChannelId,
    pub payload: FsRequestPayload,
}

/// Typed request payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsRequestPayload {
    Open {
        node: NodeId,
    },
    Write {
        node: NodeId,
        offset: u64,
        data: Vec<u8>,
    },
    Read {
        node: NodeId,
        offset: u64,
        len: usize,
    },
    Close {
        node: NodeId,
    },
    Lookup {
        dir: Option<NodeId>,
        name: String,
    },
    GetAttr {
        node: NodeId,
        field: AttrField,
    },
    SetAttr {
        node: NodeId,
        field: AttrField,
        value: u64,
    },
    Link {
        dir: NodeId,
        name: String,
        target: NodeId,
    },
    Unlink {
        dir: NodeId,
        name: String,
    },
    Create {
        kind: NodeKind,
        mode: u32,
    },
    Destroy {
        dir: NodeId,
        name: String,
    },
    Mkdir {
        dir: NodeId,
        name: String,
        mode: u32,
    },
    Rmdir {
        dir: NodeId,
        name: String,
    },
    Readdir {
        dir: NodeId,
        cursor: ReaddirCursor,
        capacity: usize,
    },
    Ioctl {
        node: NodeId,
        command: u32,
        arg: u64,
    },
}

impl FsRequestPayload {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            FsRequestPayload::Open { .. } => "open",
            FsRequestPayload::Write { .. } => "write",
            FsRequestPayload::Read { .. } => "read",
            FsRequestPayload::Close { .. } => "close",
            FsRequestPayload::Lookup { .. } => "lookup",
            FsRequestPayload::GetAttr { .. } => "getattr",
            FsRequestPayload::SetAttr { .. } => "setattr",
            FsRequestPayload::Link { .. } => "link",
            FsRequestPayload::Unlink { .. } => "unlink",
            FsRequestPayload::Create { .. } => "create",
            FsRequestPayload::Destroy { .. } => "destroy",
            FsRequestPayload::Mkdir { .. } => "mkdir",
            FsRequestPayload::Rmdir { .. } => "rmdir",
            FsRequestPayload::Readdir { .. } => "readdir",
            FsRequestPayload::Ioctl { .. } => "ioctl",
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsResponse {
    pub request_id: MessageId,
    pub payload: FsResponsePayload,
}

/// Result type used in responses
pub type FsResult<T> = Result<T, FsWireError>;

/// Typed response payloads, one per request kind
///
/// `Invalid` answers a request that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsResponsePayload {
    Open(FsResult<()>),
    Write(FsResult<usize>),
    Read(FsResult<Vec<u8>>),
    Close(FsResult<()>),
    Lookup(FsResult<NodeId>),
    GetAttr(FsResult<u64>),
    SetAttr(FsResult<()>),
    Link(FsResult<()>),
    Unlink(FsResult<()>),
    Create(FsResult<NodeId>),
    Destroy(FsResult<()>),
    Mkdir(FsResult<NodeId>),
    Rmdir(FsResult<()>),
    Readdir(FsResult<ReadDir>),
    Ioctl(FsResult<u64>),
    Invalid(FsWireError),
}

/// Errors when encoding or decoding protocol messages
#[derive(Debug, Error)]
pub enum FsCodecError {
    #[error("Unexpected action: {0}")]
    UnexpectedAction(String),

    #[error("Schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch {
        expected: SchemaVersion,
        actual: SchemaVersion,
    },

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Encoder/decoder for protocol messages
#[derive(Debug, Clone, Copy)]
pub struct FsCodec {
    service_id: ServiceId,
}

impl FsCodec {
    pub fn new(service_id: ServiceId) -> Self {
        Self { service_id }
    }

    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    pub fn encode_request(&self, request: &FsRequest) -> Result<MessageEnvelope, FsCodecError> {
        let payload = MessagePayload::new(request)?;
        Ok(MessageEnvelope::new(
            self.service_id,
            FS_REQUEST_ACTION,
            FS_SCHEMA_VERSION,
            payload,
        ))
    }

    pub fn encode_response(
        &self,
        response: &FsResponse,
        correlation_id: MessageId,
    ) -> Result<MessageEnvelope, FsCodecError> {
        let payload = MessagePayload::new(response)?;
        Ok(MessageEnvelope::new(
            self.service_id,
            FS_RESPONSE_ACTION,
            FS_SCHEMA_VERSION,
            payload,
        )
        .with_correlation(correlation_id))
    }

    pub fn decode_request(&self, message: &MessageEnvelope) -> Result<FsRequest, FsCodecError> {
        Self::check_header(message, FS_REQUEST_ACTION)?;
        Ok(message.payload.deserialize::<FsRequest>()?)
    }

    pub fn decode_response(&self, message: &MessageEnvelope) -> Result<FsResponse, FsCodecError> {
        Self::check_header(message, FS_RESPONSE_ACTION)?;
        Ok(message.payload.deserialize::<FsResponse>()?)
    }

    /// Recovers the request id and reply channel of a message whose payload
    /// does not decode as a full request
    pub fn salvage_reply_route(message: &MessageEnvelope) -> Option<(MessageId, ChannelId)> {
        #[derive(Deserialize)]
        struct Route {
            request_id: MessageId,
            reply_to: ChannelId,
        }
        message
            .payload
            .deserialize::<Route>()
            .ok()
            .map(|route| (route.request_id, route.reply_to))
    }

    fn check_header(message: &MessageEnvelope, action: &str) -> Result<(), FsCodecError> {
        if message.action != action {
            return Err(FsCodecError::UnexpectedAction(message.action.clone()));
        }
        if !message.schema_version.is_compatible_with(&FS_SCHEMA_VERSION) {
            return Err(FsCodecError::SchemaMismatch {
                expected: FS_SCHEMA_VERSION,
                actual: message.schema_version,
            });
        }
        Ok(())
    }
}
