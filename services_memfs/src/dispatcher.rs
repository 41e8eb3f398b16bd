//! Request dispatcher
//!
//! One server drains one channel: receive, route by request kind, run the
//! operation, respond. Every decoded request gets exactly one response.

use ipc::{ChannelId, MessageEnvelope, MessageId};
use kernel_api::{KernelApi, KernelError};
use log::{debug, warn};
use std::sync::Arc;

use crate::operations::FileSystemOperations;
use crate::protocol::{FsCodec, FsRequestPayload, FsResponse, FsResponsePayload, FsResult};
use crate::{FsError, FsWireError, MemFs};

/// Runs one request against an operation layer
pub fn dispatch<F>(fs: &F, payload: FsRequestPayload) -> FsResponsePayload
where
    F: FileSystemOperations<Error = FsError> + ?Sized,
{
    fn wire<T>(result: Result<T, FsError>) -> FsResult<T> {
        result.map_err(FsWireError::from)
    }

    match payload {
        FsRequestPayload::Open { .. } => FsResponsePayload::Open(Ok(())),
        FsRequestPayload::Close { .. } => FsResponsePayload::Close(Ok(())),
        FsRequestPayload::Write { node, offset, data } => {
            FsResponsePayload::Write(wire(fs.write(node, offset, &data)))
        }
        FsRequestPayload::Read { node, offset, len } => {
            FsResponsePayload::Read(wire(fs.read(node, offset, len)))
        }
        FsRequestPayload::Lookup { dir, name } => {
            FsResponsePayload::Lookup(wire(fs.lookup(dir, &name)))
        }
        FsRequestPayload::GetAttr { node, field } => {
            FsResponsePayload::GetAttr(wire(fs.get_attr(node, field)))
        }
        FsRequestPayload::SetAttr { node, field, value } => {
            FsResponsePayload::SetAttr(wire(fs.set_attr(node, field, value)))
        }
        FsRequestPayload::Link { dir, name, target } => {
            FsResponsePayload::Link(wire(fs.link(dir, &name, target)))
        }
        FsRequestPayload::Unlink { dir, name } => {
            FsResponsePayload::Unlink(wire(fs.unlink(dir, &name)))
        }
        FsRequestPayload::Create { kind, mode } => {
            FsResponsePayload::Create(wire(fs.create(kind, mode)))
        }
        FsRequestPayload::Destroy { dir, name } => {
            FsResponsePayload::Destroy(wire(fs.destroy(dir, &name)))
        }
        FsRequestPayload::Mkdir { dir, name, mode } => {
            FsResponsePayload::Mkdir(wire(fs.mkdir(dir, &name, mode)))
        }
        FsRequestPayload::Rmdir { dir, name } => {
            FsResponsePayload::Rmdir(wire(fs.rmdir(dir, &name)))
        }
        FsRequestPayload::Readdir {
            dir,
            cursor,
            capacity,
        } => FsResponsePayload::Readdir(wire(fs.readdir(dir, cursor, capacity))),
        FsRequestPayload::Ioctl { node, command, arg } => {
            FsResponsePayload::Ioctl(wire(fs.ioctl(node, command, arg)))
        }
    }
}

/// Namespace server bound to one kernel channel
pub struct FsServer<K: KernelApi> {
    kernel: K,
    fs: Arc<MemFs>,
    codec: FsCodec,
    channel: ChannelId,
    handled: u64,
}

impl<K: KernelApi> FsServer<K> {
    pub fn new(kernel: K, fs: Arc<MemFs>, codec: FsCodec, channel: ChannelId) -> Self {
        Self {
            kernel,
            fs,
            codec,
            channel,
            handled: 0,
        }
    }

    /// Channel the server receives requests on
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn codec(&self) -> FsCodec {
        self.codec
    }

    /// Shared handle to the operation layer
    pub fn fs(&self) -> &Arc<MemFs> {
        &self.fs
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// Number of messages handled so far
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Handles the next queued message
    ///
    /// Returns `Ok(false)` when the channel is empty.
    pub fn serve_one(&mut self) -> Result<bool, KernelError> {
        match self.kernel.receive_message(self.channel) {
            Ok(message) => {
                self.handle_message(message);
                Ok(true)
            }
            Err(KernelError::WouldBlock) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Handles queued messages until the channel is empty
    pub fn run_until_idle(&mut self) -> Result<u64, KernelError> {
        let start = self.handled;
        while self.serve_one()? {}
        Ok(self.handled - start)
    }

    /// Decodes, runs and answers one message
    ///
    /// A response that cannot be delivered is logged and dropped; the
    /// operation it answers has already taken effect.
    pub fn handle_message(&mut self, message: MessageEnvelope) {
        self.handled += 1;

        let request = match self.codec.decode_request(&message) {
            Ok(request) => request,
            Err(err) => {
                let Some((request_id, reply_to)) = FsCodec::salvage_reply_route(&message) else {
                    warn!("dropping undecodable message {}: {}", message.id, err);
                    return;
                };
                warn!("rejecting malformed request {}: {}", request_id, err);
                let payload = FsResponsePayload::Invalid(FsWireError::from(
                    FsError::InvalidArgument(err.to_string()),
                ));
                self.respond(reply_to, request_id, payload, message.id);
                return;
            }
        };

        let kind = request.payload.kind();
        let payload = dispatch(&*self.fs, request.payload);
        debug!("{} request {} handled", kind, request.request_id);
        self.respond(request.reply_to, request.request_id, payload, message.id)
    }

    fn respond(
        &mut self,
        reply_to: ChannelId,
        request_id: MessageId,
        payload: FsResponsePayload,
        correlation_id: MessageId,
    ) {
        let response = FsResponse {
            request_id,
            payload,
        };
        let message = match self.codec.encode_response(&response, correlation_id) {
            Ok(message) => message,
            Err(err) => {
                warn!("cannot encode response to {}: {}", request_id, err);
                return;
            }
        };
        if let Err(err) = self.kernel.send_message(reply_to, message) {
            warn!("response to {} lost on {}: {}", request_id, reply_to, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemFsConfig;
    use core_types::{NodeId, NodeKind};

    fn fs() -> MemFs {
        let fs = MemFs::new(&MemFsConfig::default());
        fs.init_root(0o755).unwrap();
        fs
    }

    #[test]
    fn test_open_and_close_are_stateless() {
        let fs = fs();
        let missing = NodeId::new(99, 0);
        assert_eq!(
            dispatch(&fs, FsRequestPayload::Open { node: missing }),
            FsResponsePayload::Open(Ok(()))
        );
        assert_eq!(
            dispatch(&fs, FsRequestPayload::Close { node: missing }),
            FsResponsePayload::Close(Ok(()))
        );
    }

    #[test]
    fn test_failed_write_is_answered() {
        let fs = fs();
        let payload = dispatch(
            &fs,
            FsRequestPayload::Write {
                node: NodeId::new(42, 0),
                offset: 0,
                data: b"lost".to_vec(),
            },
        );
        match payload {
            FsResponsePayload::Write(Err(err)) => {
                assert_eq!(err.kind, crate::FsErrorKind::NotFound)
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_write_then_read_through_dispatch() {
        let fs = fs();
        let file = match dispatch(
            &fs,
            FsRequestPayload::Create {
                kind: NodeKind::File,
                mode: 0o644,
            },
        ) {
            FsResponsePayload::Create(Ok(id)) => id,
            other => panic!("unexpected payload {:?}", other),
        };

        dispatch(
            &fs,
            FsRequestPayload::Write {
                node: file,
                offset: 0,
                data: b"boot".to_vec(),
            },
        );
        assert_eq!(
            dispatch(
                &fs,
                FsRequestPayload::Read {
                    node: file,
                    offset: 1,
                    len: 16
                }
            ),
            FsResponsePayload::Read(Ok(b"oot".to_vec()))
        );
    }

    #[test]
    fn test_ioctl_unsupported() {
        let fs = fs();
        match dispatch(
            &fs,
            FsRequestPayload::Ioctl {
                node: NodeId::ROOT,
                command: 1,
                arg: 0,
            },
        ) {
            FsResponsePayload::Ioctl(Err(err)) => {
                assert_eq!(err.kind, crate::FsErrorKind::Unsupported)
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
