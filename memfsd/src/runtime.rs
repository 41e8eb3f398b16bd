//! # Daemon Runtime
//!
//! Boots the namespace service on a simulated kernel and feeds it script
//! commands through a client, so every command crosses the same channel a
//! real client would use.

use crate::commands::{CommandError, FsCommand, FsCommandParser};
use core_types::{NodeId, NodeKind};
use fs_view::PathResolver;
use kernel_api::KernelError;
use log::{info, warn};
use services_memfs::{
    bootstrap, AttrField, BootstrapError, ClientError, FileSystemOperations, FsClient, FsError,
    LoopbackTransport, MemFsConfig, ReaddirCursor,
};
use sim_kernel::SimulatedKernel;
use std::collections::VecDeque;
use thiserror::Error;

const READ_CHUNK: usize = 4096;
const LISTING_CAPACITY: usize = 512;

/// A script line that failed to parse
#[derive(Debug, Error)]
#[error("line {line}: {source}")]
pub struct ScriptError {
    pub line: usize,
    #[source]
    pub source: CommandError,
}

/// Daemon error types
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Transport failed: {0}")]
    Transport(ClientError),
}

/// Daemon configuration
#[derive(Debug, Clone, Default)]
pub struct DaemonConfig {
    /// Namespace service configuration
    pub fs: MemFsConfig,
    /// Optional command script
    pub script: Option<String>,
    /// Maximum commands to run (0 = unlimited)
    pub max_steps: usize,
}

#[derive(Debug, Clone)]
struct ScriptLine {
    line: usize,
    text: String,
    command: FsCommand,
}

/// Parses a whole script up front so a typo fails before anything runs
fn parse_script(text: &str) -> Result<VecDeque<ScriptLine>, ScriptError> {
    let mut lines = VecDeque::new();
    for (index, raw) in text.lines().enumerate() {
        let parsed = FsCommandParser::parse(raw).map_err(|source| ScriptError {
            line: index + 1,
            source,
        })?;
        if let Some(command) = parsed {
            lines.push_back(ScriptLine {
                line: index + 1,
                text: raw.trim().to_string(),
                command,
            });
        }
    }
    Ok(lines)
}

/// The daemon
pub struct MemfsDaemon {
    config: DaemonConfig,
    client: FsClient<LoopbackTransport<SimulatedKernel>>,
    script: VecDeque<ScriptLine>,
    steps: usize,
}

impl MemfsDaemon {
    /// Boots the service and parses the script
    pub fn new(config: DaemonConfig) -> Result<Self, DaemonError> {
        let script = match &config.script {
            Some(text) => parse_script(text)?,
            None => VecDeque::new(),
        };

        let kernel = SimulatedKernel::with_queue_capacity(config.fs.queue_capacity);
        let server = bootstrap(kernel, &config.fs)?;
        let codec = server.codec();
        let client = FsClient::new(LoopbackTransport::new(server)?, codec);
        info!("memfsd ready, {} script commands", script.len());

        Ok(Self {
            config,
            client,
            script,
            steps: 0,
        })
    }

    /// Runs the script, returning the output lines
    ///
    /// A command that fails with an operation error reports it and the
    /// script goes on; a transport failure stops the run.
    pub fn run(&mut self) -> Result<Vec<String>, DaemonError> {
        let mut output = Vec::new();

        while let Some(entry) = self.script.pop_front() {
            if self.config.max_steps > 0 && self.steps >= self.config.max_steps {
                info!("stopping after {} commands", self.steps);
                break;
            }
            self.steps += 1;

            match self.execute(&entry.command) {
                Ok(lines) => output.extend(lines),
                Err(ClientError::Fs(err)) => {
                    warn!("line {}: {}", entry.line, err);
                    output.push(format!("{}: {} (errno {})", entry.text, err, err.errno()));
                }
                Err(err) => return Err(DaemonError::Transport(err)),
            }
        }

        Ok(output)
    }

    /// Commands executed so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Live nodes in the service, root included
    pub fn live_nodes(&self) -> usize {
        self.client
            .with_transport(|transport| transport.server().fs().live_nodes())
    }

    /// Requests the server has handled
    pub fn requests_handled(&self) -> u64 {
        self.client
            .with_transport(|transport| transport.server().handled())
    }

    /// Runs one command
    pub fn execute(&self, command: &FsCommand) -> Result<Vec<String>, ClientError> {
        match command {
            FsCommand::Mkdir { path, mode } => {
                let (dir, name) = self.parent(path)?;
                self.client.mkdir(dir, &name, *mode)?;
                Ok(Vec::new())
            }
            FsCommand::Touch { path, mode } => {
                self.ensure_file(path, *mode)?;
                Ok(Vec::new())
            }
            FsCommand::Write { path, text } => {
                let file = self.ensure_file(path, 0o644)?;
                self.client.open(file)?;
                self.client.set_attr(file, AttrField::Size, 0)?;
                self.client.write(file, 0, text.as_bytes())?;
                self.client.close(file)?;
                Ok(Vec::new())
            }
            FsCommand::Append { path, text } => {
                let file = self.ensure_file(path, 0o644)?;
                self.client.open(file)?;
                let size = self.client.get_attr(file, AttrField::Size)?;
                self.client.write(file, size, text.as_bytes())?;
                self.client.close(file)?;
                Ok(Vec::new())
            }
            FsCommand::Cat { path } => {
                let file = self.client.resolve(path)?;
                self.client.open(file)?;
                let mut data = Vec::new();
                loop {
                    let chunk = self.client.read(file, data.len() as u64, READ_CHUNK)?;
                    if chunk.is_empty() {
                        break;
                    }
                    data.extend_from_slice(&chunk);
                }
                self.client.close(file)?;
                Ok(String::from_utf8_lossy(&data)
                    .lines()
                    .map(str::to_string)
                    .collect())
            }
            FsCommand::Ls { path } => self.list(path),
            FsCommand::Stat { path } => {
                let node = self.client.resolve(path)?;
                Ok(vec![format!(
                    "{} {} size={} mode={:o} uid={} gid={}",
                    path,
                    node,
                    self.client.get_attr(node, AttrField::Size)?,
                    self.client.get_attr(node, AttrField::Mode)?,
                    self.client.get_attr(node, AttrField::Owner)?,
                    self.client.get_attr(node, AttrField::Group)?,
                )])
            }
            FsCommand::Chmod { mode, path } => {
                let node = self.client.resolve(path)?;
                self.client.set_attr(node, AttrField::Mode, u64::from(*mode))?;
                Ok(Vec::new())
            }
            FsCommand::Truncate { path, size } => {
                let node = self.client.resolve(path)?;
                self.client.set_attr(node, AttrField::Size, *size)?;
                Ok(Vec::new())
            }
            FsCommand::Rm { path } => {
                let (dir, name) = self.parent(path)?;
                self.client.destroy(dir, &name)?;
                Ok(Vec::new())
            }
            FsCommand::Rmdir { path } => {
                let (dir, name) = self.parent(path)?;
                self.client.rmdir(dir, &name)?;
                Ok(Vec::new())
            }
        }
    }

    fn parent(&self, path: &str) -> Result<(NodeId, String), ClientError> {
        let (components, name) = PathResolver::split_parent(path)
            .map_err(|err| FsError::InvalidArgument(err.to_string()))?;
        let dir = self.client.resolve(&format!("/{}", components.join("/")))?;
        Ok((dir, name.to_string()))
    }

    fn ensure_file(&self, path: &str, mode: u32) -> Result<NodeId, ClientError> {
        let (dir, name) = self.parent(path)?;
        match self.client.lookup(Some(dir), &name) {
            Ok(node) => Ok(node),
            Err(ClientError::Fs(FsError::NotFound(_))) => {
                let node = self.client.create(NodeKind::File, mode)?;
                self.client.link(dir, &name, node)?;
                Ok(node)
            }
            Err(err) => Err(err),
        }
    }

    fn list(&self, path: &str) -> Result<Vec<String>, ClientError> {
        let dir = self.client.resolve(path)?;
        let mut cursor = ReaddirCursor::start();
        let mut lines = Vec::new();
        loop {
            let batch = self.client.readdir(dir, cursor, LISTING_CAPACITY)?;
            if batch.is_end() {
                break;
            }
            let records = batch
                .records()
                .map_err(|err| ClientError::Protocol(err.to_string()))?;
            for record in records {
                lines.push(format!("{:<24} {}", record.name, record.node));
            }
            cursor = batch.next;
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daemon(script: &str) -> MemfsDaemon {
        MemfsDaemon::new(DaemonConfig {
            script: Some(script.to_string()),
            ..DaemonConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_script_parse_error_reports_line() {
        let result = MemfsDaemon::new(DaemonConfig {
            script: Some("mkdir /a\n\nfrobnicate /a\n".to_string()),
            ..DaemonConfig::default()
        });
        match result {
            Err(DaemonError::Script(err)) => assert_eq!(err.line, 3),
            other => panic!("unexpected result {:?}", other.err()),
        }
    }

    #[test]
    fn test_write_and_cat() {
        let mut daemon = daemon("mkdir /etc\nwrite /etc/motd \"hello\\nworld\"\ncat /etc/motd\n");
        let output = daemon.run().unwrap();
        assert_eq!(output, vec!["hello", "world"]);
        assert_eq!(daemon.steps(), 3);
        assert_eq!(daemon.live_nodes(), 3);
    }

    #[test]
    fn test_append_extends_file() {
        let mut daemon = daemon("write /log one\nappend /log \" two\"\ncat /log\n");
        assert_eq!(daemon.run().unwrap(), vec!["one two"]);
    }

    #[test]
    fn test_failures_are_reported_and_script_continues() {
        let mut daemon = daemon("mkdir /a\nmkdir /a\nrmdir /missing\nls /\n");
        let output = daemon.run().unwrap();

        assert_eq!(output[0], "mkdir /a: Already exists: a in Node(0v0) (errno -17)");
        assert!(output[1].starts_with("rmdir /missing: Not found"));
        assert!(output[2].starts_with(".."));
        assert!(output[3].starts_with("a "));
    }

    #[test]
    fn test_max_steps_stops_early() {
        let mut daemon = MemfsDaemon::new(DaemonConfig {
            script: Some("mkdir /a\nmkdir /b\nmkdir /c\n".to_string()),
            max_steps: 2,
            ..DaemonConfig::default()
        })
        .unwrap();
        daemon.run().unwrap();
        assert_eq!(daemon.steps(), 2);
        assert_eq!(daemon.live_nodes(), 3);
    }

    #[test]
    fn test_stat_and_chmod() {
        let mut daemon = daemon("touch /f\nwrite /f abc\nchmod 600 /f\nstat /f\n");
        let output = daemon.run().unwrap();
        assert_eq!(output.len(), 1);
        assert!(output[0].ends_with("size=3 mode=600 uid=0 gid=0"));
    }

    #[test]
    fn test_rm_and_rmdir() {
        let mut daemon = daemon("mkdir /d\ntouch /d/f\nrmdir /d\nrm /d/f\nrmdir /d\nls\n");
        let output = daemon.run().unwrap();
        assert!(output[0].starts_with("rmdir /d: Busy"));
        assert_eq!(output.len(), 2);
        assert_eq!(daemon.live_nodes(), 1);
    }
}
