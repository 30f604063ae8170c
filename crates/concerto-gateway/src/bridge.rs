//! Protocol bridge: splices an HTTP exchange onto a Git subprocess.
//!
//! ```text
//!  request body ─▶ [gunzip] ─▶ inspector ─▶ stdin ┐
//!                                                 git-<service>-pack
//!  response body ◀─ [service preamble] ◀─ stdout ┘
//! ```
//!
//! The child and the stdin pump are owned by the response body stream.
//! Dropping the body (client disconnect) kills the child and aborts the pump.

use crate::error::GatewayError;
use crate::gunzip::GunzipStream;
use crate::resolver::RepositoryHandle;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use concerto_auth::Identity;
use concerto_git::{Inspection, RefUpdateKind, RequestInspector, ServiceDescriptor};
use futures::{stream, Stream, StreamExt, TryStreamExt};
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::AbortHandle;
use tokio_util::io::ReaderStream;
use tracing::Instrument;

/// Header carrying the client's requested protocol version.
const GIT_PROTOCOL_HEADER: &str = "git-protocol";

type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Spawns Git subprocesses for resolved repositories.
#[derive(Debug, Clone, Default)]
pub struct ProtocolBridge {
    git_program: Option<String>,
    git_options: Vec<String>,
}

impl ProtocolBridge {
    /// Runs dashed `git-<service>` programs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs services through a `git` wrapper binary.
    pub fn with_git_program(program: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            git_program: Some(program.into()),
            git_options: options,
        }
    }

    /// Serves one smart HTTP exchange for a negotiated service against `repo`.
    pub async fn bridge(
        &self,
        request: Request,
        descriptor: ServiceDescriptor,
        repo: &RepositoryHandle,
        identity: &Identity,
    ) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();
        let body = request_stream(&parts.headers, body);

        let descriptor = match &self.git_program {
            Some(program) => descriptor.with_git_program(program.clone(), &self.git_options),
            None => descriptor,
        };

        let mut command = Command::new(&descriptor.program);
        command
            .args(&descriptor.args)
            .arg(&repo.path)
            .env("REMOTE_USER", &identity.username)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(protocol) = parts
            .headers
            .get(GIT_PROTOCOL_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            command.env("GIT_PROTOCOL", protocol);
        }

        let mut child = command.spawn().map_err(|source| GatewayError::Spawn {
            program: descriptor.program.clone(),
            source,
        })?;

        tracing::info!(
            service = %descriptor.service,
            action = ?descriptor.action,
            app = %repo.app,
            user = %identity,
            pid = ?child.id(),
            "spawned git service"
        );

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GatewayError::Subprocess("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GatewayError::Subprocess("stdout not captured".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_stderr(stderr, descriptor.program.clone()).in_current_span());
        }

        let pump = tokio::spawn(
            pump_request(
                body,
                stdin,
                descriptor.request_inspector(),
                identity.clone(),
            )
            .in_current_span(),
        );
        let pump = AbortOnDrop(pump.abort_handle());

        let mut output = ProcessOutput {
            stdout: ReaderStream::new(stdout),
            child,
            program: descriptor.program.clone(),
            _pump: pump,
        };

        // Nothing has been sent yet: a child that dies without output can
        // still be reported as a 500.
        let first = match output.stdout.next().await {
            Some(Ok(chunk)) => Some(chunk),
            Some(Err(e)) => return Err(GatewayError::Io(e)),
            None => {
                output.wait_success().await?;
                None
            }
        };

        let head = descriptor.response_prefix().into_iter().chain(first);
        let body = stream::iter(head.map(Ok)).chain(output.into_stream());

        Ok(git_response(&descriptor, Body::from_stream(body)))
    }
}

fn git_response(descriptor: &ServiceDescriptor, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    if let Ok(content_type) = HeaderValue::from_str(&descriptor.content_type) {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// Selects the request body stream, decoding gzip when announced.
fn request_stream(headers: &HeaderMap, body: Body) -> ByteStream {
    let raw: ByteStream = Box::pin(
        body.into_data_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e)),
    );

    let gzip = headers
        .get(header::CONTENT_ENCODING)
        .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"gzip"));
    if gzip {
        Box::pin(GunzipStream::new(raw))
    } else {
        raw
    }
}

/// Feeds the request body to the child's stdin, in order and with
/// backpressure: a chunk is written before the next one is read.
async fn pump_request(
    mut body: ByteStream,
    mut stdin: ChildStdin,
    mut inspector: RequestInspector,
    identity: Identity,
) {
    let mut total = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(error = %e, bytes = total, "request body failed");
                return;
            }
        };

        inspector.observe(&chunk);
        if let Err(e) = stdin.write_all(&chunk).await {
            tracing::debug!(error = %e, bytes = total, "git service closed stdin");
            return;
        }
        total += chunk.len();
    }

    if let Err(e) = stdin.shutdown().await {
        tracing::debug!(error = %e, "failed to close git stdin");
    }
    drop(stdin);

    log_inspection(inspector.finish(), &identity, total);
}

fn log_inspection(inspection: Inspection, identity: &Identity, bytes: usize) {
    match inspection {
        Inspection::Advertise => {}
        Inspection::Push(updates) => {
            for update in &updates {
                let kind = match update.kind() {
                    RefUpdateKind::Create => "create",
                    RefUpdateKind::Delete => "delete",
                    RefUpdateKind::Update => "update",
                };
                tracing::info!(
                    user = %identity,
                    refname = %update.name,
                    old = %update.old,
                    new = %update.new,
                    kind,
                    "push ref update"
                );
            }
            tracing::info!(user = %identity, refs = updates.len(), bytes, "push received");
        }
        Inspection::Fetch { wants, command } => {
            tracing::info!(
                user = %identity,
                wants,
                command = command.as_deref().unwrap_or("fetch"),
                bytes,
                "fetch received"
            );
        }
        Inspection::Unparsed => {
            tracing::debug!(user = %identity, bytes, "request commands not inspected");
        }
    }
}

/// Logs the child's stderr line by line until it closes.
async fn log_stderr(stderr: ChildStderr, program: String) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                tracing::debug!(program = %program, "stderr: {}", text.trim_end());
            }
        }
    }
}

/// Aborts a task when dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The child's stdout together with everything that must die with it.
struct ProcessOutput {
    stdout: ReaderStream<ChildStdout>,
    child: Child,
    program: String,
    _pump: AbortOnDrop,
}

impl ProcessOutput {
    async fn wait_success(&mut self) -> Result<(), GatewayError> {
        let status = self.child.wait().await?;
        if status.success() {
            tracing::debug!(program = %self.program, "git service finished");
            Ok(())
        } else {
            tracing::error!(program = %self.program, %status, "git service failed");
            Err(GatewayError::Subprocess(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }

    /// Remaining stdout, then the exit status. A failed exit ends the body
    /// with an error so the client sees an aborted transfer.
    fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut output = state?;
            match output.stdout.next().await {
                Some(Ok(chunk)) => Some((Ok(chunk), Some(output))),
                Some(Err(e)) => Some((Err(e), None)),
                None => match output.wait_success().await {
                    Ok(()) => None,
                    Err(e) => Some((Err(io::Error::other(e.to_string())), None)),
                },
            }
        })
    }
}
