//! Client handle for the service daemon.
//!
//! [`ServiceClient`] is a cheap, cloneable wrapper around the request
//! channel: one async method per boundary operation. Methods submit a
//! request and await its `oneshot` reply, so any number of calls may be in
//! flight concurrently from any number of clones.
//!
//! Engine-level failures never surface as [`ClientError`]: a handle that
//! does not resolve comes back as `None`/`false`, a parse or run failure
//! comes back as an error handle. `ClientError` covers only the transport
//! (channel full, daemon gone, reply abandoned).

use crate::diagnostics::CanonicalError;
use crate::language::{ModuleDescriptor, ModuleHandle, RunContext};
use crate::registry::{ErrorHandle, ExpressionHandle, FixHandle, ObjectHandle, ProgramHandle};
use crate::service::error::ClientError;
use crate::service::request::{ParseReply, RunReply, ServiceRequest};
use crate::source::SourceOrigin;
use std::ops::Range;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// A connection to the service daemon.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    request_tx: mpsc::Sender<ServiceRequest>,
}

impl ServiceClient {
    pub fn new(request_tx: mpsc::Sender<ServiceRequest>) -> Self {
        Self { request_tx }
    }

    /// Returns `false` once the daemon has shut down.
    pub fn is_connected(&self) -> bool {
        !self.request_tx.is_closed()
    }

    fn submit(&self, request: ServiceRequest) -> Result<(), ClientError> {
        self.request_tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => ClientError::ChannelFull,
            TrySendError::Closed(_) => ClientError::ChannelClosed,
        })
    }

    async fn call<T>(
        &self,
        request: ServiceRequest,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, ClientError> {
        self.submit(request)?;
        rx.await.map_err(|_| ClientError::ReplyAbandoned)
    }

    // --- Module lifecycle -------------------------------------------------

    /// Loads a language module by identifier.
    ///
    /// `Ok(None)` for unknown identifiers or modules the daemon refuses.
    pub async fn load_module(&self, identifier: &str) -> Result<Option<ModuleHandle>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::LoadModule {
                identifier: identifier.to_string(),
                reply,
            },
            rx,
        )
        .await
    }

    /// Releases one reference to a loaded module.
    pub async fn unload_module(&self, handle: ModuleHandle) -> Result<bool, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::UnloadModule { handle, reply }, rx)
            .await
    }

    /// Enumerates the modules the daemon can load.
    pub async fn list_modules(&self) -> Result<Vec<ModuleDescriptor>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::ListModules { reply }, rx).await
    }

    // --- Programs ---------------------------------------------------------

    /// Parses source text with a loaded module.
    ///
    /// The inner result holds exactly one of a program handle or an error
    /// handle.
    pub async fn parse(
        &self,
        source: &str,
        origin: Option<SourceOrigin>,
        module: ModuleHandle,
    ) -> Result<ParseReply, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::Parse {
                source: source.to_string(),
                origin,
                module,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn release_program(&self, handle: ProgramHandle) -> Result<bool, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::ReleaseProgram { handle, reply }, rx)
            .await
    }

    /// Opaque styled-text blob for a program, or `None` when highlighting
    /// is unsupported or the handle does not resolve.
    pub async fn highlight(&self, handle: ProgramHandle) -> Result<Option<Vec<u8>>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::Highlight { handle, reply }, rx)
            .await
    }

    pub async fn pretty_print(
        &self,
        handle: ProgramHandle,
    ) -> Result<Option<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::PrettyPrint { handle, reply }, rx)
            .await
    }

    /// Renders a program in another module's dialect.
    pub async fn reformat(
        &self,
        handle: ProgramHandle,
        module: ModuleHandle,
    ) -> Result<Option<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::Reformat {
                handle,
                module,
                reply,
            },
            rx,
        )
        .await
    }

    /// Executes a program. The inner result holds exactly one of an object
    /// handle or an error handle.
    pub async fn run(
        &self,
        handle: ProgramHandle,
        context: RunContext,
    ) -> Result<RunReply, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::Run {
                handle,
                context,
                reply,
            },
            rx,
        )
        .await
    }

    // --- Expressions ------------------------------------------------------

    /// Locates the innermost expression at a character offset.
    pub async fn locate_expression(
        &self,
        offset: usize,
        program: ProgramHandle,
    ) -> Result<Option<ExpressionHandle>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::LocateExpression {
                offset,
                program,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn describe_expression_kind(
        &self,
        handle: ExpressionHandle,
    ) -> Result<Option<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::DescribeExpressionKind { handle, reply }, rx)
            .await
    }

    pub async fn describe_expression_kind_detail(
        &self,
        handle: ExpressionHandle,
    ) -> Result<Option<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::DescribeExpressionKindDetail { handle, reply },
            rx,
        )
        .await
    }

    pub async fn release_expression(
        &self,
        handle: ExpressionHandle,
    ) -> Result<bool, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::ReleaseExpression { handle, reply }, rx)
            .await
    }

    // --- Runtime objects --------------------------------------------------

    /// Textual description of a runtime object.
    pub async fn describe_object(
        &self,
        handle: ObjectHandle,
    ) -> Result<Option<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::DescribeObject { handle, reply }, rx)
            .await
    }

    pub async fn release_object(&self, handle: ObjectHandle) -> Result<bool, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::ReleaseObject { handle, reply }, rx)
            .await
    }

    // --- Errors and fixes -------------------------------------------------

    /// Converts an error handle into its structured domain/code/message.
    pub async fn materialize_error(
        &self,
        handle: ErrorHandle,
    ) -> Result<Option<CanonicalError>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::MaterializeError { handle, reply }, rx)
            .await
    }

    pub async fn release_error(&self, handle: ErrorHandle) -> Result<bool, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::ReleaseError { handle, reply }, rx)
            .await
    }

    /// Zero-based line range of the fault. `source` must be the exact text
    /// that was parsed; a mismatch yields `None`.
    pub async fn line_range(
        &self,
        handle: ErrorHandle,
        source: &str,
    ) -> Result<Option<Range<usize>>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::LineRange {
                handle,
                source: source.to_string(),
                reply,
            },
            rx,
        )
        .await
    }

    /// Zero-based column range of the fault. Same staleness rules as
    /// [`line_range`](ServiceClient::line_range).
    pub async fn column_range(
        &self,
        handle: ErrorHandle,
        source: &str,
    ) -> Result<Option<Range<usize>>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::ColumnRange {
                handle,
                source: source.to_string(),
                reply,
            },
            rx,
        )
        .await
    }

    /// Character range of the fault. Same staleness rules as
    /// [`line_range`](ServiceClient::line_range).
    pub async fn character_range(
        &self,
        handle: ErrorHandle,
        source: &str,
    ) -> Result<Option<Range<usize>>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::CharacterRange {
                handle,
                source: source.to_string(),
                reply,
            },
            rx,
        )
        .await
    }

    /// Ranked candidate fixes for an error, best first.
    pub async fn fixes_for_error(
        &self,
        handle: ErrorHandle,
    ) -> Result<Vec<FixHandle>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(ServiceRequest::FixesForError { handle, reply }, rx)
            .await
    }

    /// Context-anchored fix descriptions, positionally aligned 1:1 with
    /// `fixes` (empty string for any fix that cannot be described).
    pub async fn contextual_fix_descriptions(
        &self,
        source: &str,
        fixes: Vec<FixHandle>,
    ) -> Result<Vec<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::ContextualFixDescriptions {
                source: source.to_string(),
                fixes,
                reply,
            },
            rx,
        )
        .await
    }

    /// Short fix descriptions, positionally aligned 1:1 with `fixes`.
    pub async fn simple_fix_descriptions(
        &self,
        source: &str,
        fixes: Vec<FixHandle>,
    ) -> Result<Vec<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::SimpleFixDescriptions {
                source: source.to_string(),
                fixes,
                reply,
            },
            rx,
        )
        .await
    }

    /// Applies a fix to resupplied source text. `None` when the fix no
    /// longer applies to this exact text.
    pub async fn apply_fix(
        &self,
        fix: FixHandle,
        source: &str,
    ) -> Result<Option<String>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            ServiceRequest::ApplyFix {
                fix,
                source: source.to_string(),
                reply,
            },
            rx,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_channel_reports_channel_closed() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let client = ServiceClient::new(tx);

        assert!(!client.is_connected());
        assert_eq!(
            client.list_modules().await.unwrap_err(),
            ClientError::ChannelClosed
        );
    }

    #[tokio::test]
    async fn test_full_channel_reports_backpressure() {
        let (tx, _rx) = mpsc::channel(1);
        let client = ServiceClient::new(tx);

        // First request occupies the only slot; nobody is draining.
        let first = tokio::spawn({
            let client = client.clone();
            async move { client.list_modules().await }
        });
        tokio::task::yield_now().await;

        assert_eq!(
            client.list_modules().await.unwrap_err(),
            ClientError::ChannelFull
        );
        first.abort();
    }

    #[tokio::test]
    async fn test_abandoned_reply_surfaces() {
        let (tx, mut rx) = mpsc::channel(4);
        let client = ServiceClient::new(tx);

        let call = tokio::spawn(async move { client.list_modules().await });

        // Drop the request without answering its reply channel.
        let request = rx.recv().await.unwrap();
        drop(request);

        assert_eq!(call.await.unwrap().unwrap_err(), ClientError::ReplyAbandoned);
    }
}
