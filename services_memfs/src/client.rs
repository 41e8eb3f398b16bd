//! Remote client
//!
//! [`FsClient`] implements [`FileSystemOperations`] by sending requests
//! through an [`FsTransport`] and waiting for the matching response.

use core::cell::RefCell;
use core_types::{NodeId, NodeKind};
use ipc::{ChannelId, MessageEnvelope, MessageId};
use kernel_api::{KernelApi, KernelError};
use thiserror::Error;

use crate::dispatcher::FsServer;
use crate::operations::{AttrField, FileSystemOperations, ReadDir, ReaddirCursor};
use crate::protocol::{
    FsCodec, FsCodecError, FsRequest, FsRequestPayload, FsResponse, FsResponsePayload, FsResult,
};
use crate::FsError;

/// Errors seen by a remote caller
#[derive(Debug, Error)]
pub enum ClientError {
    /// The operation itself failed
    #[error(transparent)]
    Fs(#[from] FsError),

    /// The request or response could not travel
    #[error("Transport error: {0}")]
    Transport(#[from] KernelError),

    #[error("Codec error: {0}")]
    Codec(#[from] FsCodecError),

    /// The response does not answer the request
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// The operation error, if that is what this is
    pub fn as_fs(&self) -> Option<&FsError> {
        match self {
            ClientError::Fs(err) => Some(err),
            _ => None,
        }
    }
}

/// Moves protocol messages between a client and a server
pub trait FsTransport {
    /// Channel responses for this client arrive on
    fn reply_channel(&self) -> ChannelId;

    fn send(&mut self, message: MessageEnvelope) -> Result<(), KernelError>;

    fn receive(&mut self) -> Result<MessageEnvelope, KernelError>;
}

/// In-process transport that routes through the server's kernel
///
/// Requests are queued on the service channel found through the kernel's
/// service registry, the server drains the channel, and responses come back
/// on a reply channel owned by this transport.
pub struct LoopbackTransport<K: KernelApi> {
    server: FsServer<K>,
    reply_channel: ChannelId,
}

impl<K: KernelApi> LoopbackTransport<K> {
    pub fn new(mut server: FsServer<K>) -> Result<Self, KernelError> {
        let reply_channel = server.kernel_mut().create_channel()?;
        Ok(Self {
            server,
            reply_channel,
        })
    }

    pub fn server(&self) -> &FsServer<K> {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut FsServer<K> {
        &mut self.server
    }
}

impl<K: KernelApi> FsTransport for LoopbackTransport<K> {
    fn reply_channel(&self) -> ChannelId {
        self.reply_channel
    }

    fn send(&mut self, message: MessageEnvelope) -> Result<(), KernelError> {
        let service = self
            .server
            .kernel()
            .lookup_service(message.destination)?;
        self.server.kernel_mut().send_message(service, message)?;
        self.server.run_until_idle()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<MessageEnvelope, KernelError> {
        self.server.kernel_mut().receive_message(self.reply_channel)
    }
}

/// Namespace client over a transport
pub struct FsClient<T: FsTransport> {
    transport: RefCell<T>,
    codec: FsCodec,
}

impl<T: FsTransport> FsClient<T> {
    pub fn new(transport: T, codec: FsCodec) -> Self {
        Self {
            transport: RefCell::new(transport),
            codec,
        }
    }

    fn round_trip(&self, payload: FsRequestPayload) -> Result<FsResponse, ClientError> {
        let mut transport = self.transport.borrow_mut();
        let request = FsRequest {
            request_id: MessageId::new(),
            reply_to: transport.reply_channel(),
            payload,
        };

        let message = self.codec.encode_request(&request)?;
        transport.send(message)?;
        let response = self.codec.decode_response(&transport.receive()?)?;

        if response.request_id != request.request_id {
            return Err(ClientError::Protocol(
                "response request_id mismatch".to_string(),
            ));
        }
        Ok(response)
    }

    fn extract<R>(
        response: FsResponse,
        f: fn(FsResponsePayload) -> Option<FsResult<R>>,
    ) -> Result<R, ClientError> {
        let payload = match response.payload {
            FsResponsePayload::Invalid(err) => return Err(FsError::from(err).into()),
            payload => payload,
        };
        let result = f(payload)
            .ok_or_else(|| ClientError::Protocol("response payload mismatch".to_string()))?;
        result.map_err(|err| FsError::from(err).into())
    }

    pub fn with_transport<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut transport = self.transport.borrow_mut();
        f(&mut transport)
    }

    /// Announces use of a node; the service keeps no per-open state
    pub fn open(&self, node: NodeId) -> Result<(), ClientError> {
        let response = self.round_trip(FsRequestPayload::Open { node })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Open(result) => Some(result),
            _ => None,
        })
    }

    pub fn close(&self, node: NodeId) -> Result<(), ClientError> {
        let response = self.round_trip(FsRequestPayload::Close { node })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Close(result) => Some(result),
            _ => None,
        })
    }
}

impl<T: FsTransport> FileSystemOperations for FsClient<T> {
    type Error = ClientError;

    fn lookup(&self, dir: Option<NodeId>, name: &str) -> Result<NodeId, ClientError> {
        let response = self.round_trip(FsRequestPayload::Lookup {
            dir,
            name: name.to_string(),
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Lookup(result) => Some(result),
            _ => None,
        })
    }

    fn get_attr(&self, id: NodeId, field: AttrField) -> Result<u64, ClientError> {
        let response = self.round_trip(FsRequestPayload::GetAttr { node: id, field })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::GetAttr(result) => Some(result),
            _ => None,
        })
    }

    fn set_attr(&self, id: NodeId, field: AttrField, value: u64) -> Result<(), ClientError> {
        let response = self.round_trip(FsRequestPayload::SetAttr {
            node: id,
            field,
            value,
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::SetAttr(result) => Some(result),
            _ => None,
        })
    }

    fn link(&self, dir: NodeId, name: &str, target: NodeId) -> Result<(), ClientError> {
        let response = self.round_trip(FsRequestPayload::Link {
            dir,
            name: name.to_string(),
            target,
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Link(result) => Some(result),
            _ => None,
        })
    }

    fn unlink(&self, dir: NodeId, name: &str) -> Result<(), ClientError> {
        let response = self.round_trip(FsRequestPayload::Unlink {
            dir,
            name: name.to_string(),
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Unlink(result) => Some(result),
            _ => None,
        })
    }

    fn create(&self, kind: NodeKind, mode: u32) -> Result<NodeId, ClientError> {
        let response = self.round_trip(FsRequestPayload::Create { kind, mode })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Create(result) => Some(result),
            _ => None,
        })
    }

    fn destroy(&self, dir: NodeId, name: &str) -> Result<(), ClientError> {
        let response = self.round_trip(FsRequestPayload::Destroy {
            dir,
            name: name.to_string(),
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Destroy(result) => Some(result),
            _ => None,
        })
    }

    fn mkdir(&self, dir: NodeId, name: &str, mode: u32) -> Result<NodeId, ClientError> {
        let response = self.round_trip(FsRequestPayload::Mkdir {
            dir,
            name: name.to_string(),
            mode,
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Mkdir(result) => Some(result),
            _ => None,
        })
    }

    fn rmdir(&self, dir: NodeId, name: &str) -> Result<(), ClientError> {
        let response = self.round_trip(FsRequestPayload::Rmdir {
            dir,
            name: name.to_string(),
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Rmdir(result) => Some(result),
            _ => None,
        })
    }

    fn readdir(
        &self,
        dir: NodeId,
        cursor: ReaddirCursor,
        capacity: usize,
    ) -> Result<ReadDir, ClientError> {
        let response = self.round_trip(FsRequestPayload::Readdir {
            dir,
            cursor,
            capacity,
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Readdir(result) => Some(result),
            _ => None,
        })
    }

    fn ioctl(&self, id: NodeId, command: u32, arg: u64) -> Result<u64, ClientError> {
        let response = self.round_trip(FsRequestPayload::Ioctl {
            node: id,
            command,
            arg,
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Ioctl(result) => Some(result),
            _ => None,
        })
    }

    fn read(&self, id: NodeId, offset: u64, len: usize) -> Result<Vec<u8>, ClientError> {
        let response = self.round_trip(FsRequestPayload::Read {
            node: id,
            offset,
            len,
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Read(result) => Some(result),
            _ => None,
        })
    }

    fn write(&self, id: NodeId, offset: u64, data: &[u8]) -> Result<usize, ClientError> {
        let response = self.round_trip(FsRequestPayload::Write {
            node: id,
            offset,
            data: data.to_vec(),
        })?;
        Self::extract(response, |payload| match payload {
            FsResponsePayload::Write(result) => Some(result),
            _ => None,
        })
    }
}
