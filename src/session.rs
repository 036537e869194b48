//! The worksheet session: one loaded PDF, its page selection, and the
//! generate action, driven through an explicit state machine.
//!
//! ```text
//!            load(pdf)            ok
//!   Idle ─────────────▶ Extracting ───▶ Ready ◀──────────────┐
//!    ▲                      │ err         │ generate          │ ok
//!    │ reset                ▼             ▼                   │
//!    └──────────────── Error{None}    Generating ─────────────┘
//!                                         │ err
//!                                         ▼
//!                                    Error{Some(doc)} ── generate ──▶ Generating
//! ```
//!
//! Every state that can generate owns the [`LoadedDocument`], so "generate
//! with no file" is a typed error rather than a runtime guard. `generate`
//! takes `&mut self`, so a session can only have one request in flight.

use crate::config::{PageSelection, WorksheetConfig};
use crate::document::LoadedDocument;
use crate::error::WorksheetError;
use crate::generate::{extract_document, resolve_client, run_generation};
use crate::output::GenerationOutput;
use crate::pipeline::input::PdfUpload;
use crate::pipeline::prompt::build_messages;
use tracing::{info, warn};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// A PDF is being read.
    Extracting,
    /// A document is loaded and can be generated from.
    Ready(LoadedDocument),
    /// A completion request is in flight.
    Generating(LoadedDocument),
    /// The last action failed. A failed generation keeps its document.
    Error {
        message: String,
        document: Option<LoadedDocument>,
    },
}

/// Inputs to [`SessionState::apply`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoadStarted,
    Loaded(LoadedDocument),
    LoadFailed(String),
    GenerateStarted,
    Generated,
    GenerateFailed(String),
    Reset,
}

impl SessionEvent {
    fn action(&self) -> &'static str {
        match self {
            SessionEvent::LoadStarted => "load a PDF",
            SessionEvent::Loaded(_) | SessionEvent::LoadFailed(_) => "finish loading",
            SessionEvent::GenerateStarted => "generate",
            SessionEvent::Generated | SessionEvent::GenerateFailed(_) => "finish generating",
            SessionEvent::Reset => "reset",
        }
    }
}

impl SessionState {
    /// Short name used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Extracting => "extracting",
            SessionState::Ready(_) => "ready",
            SessionState::Generating(_) => "generating",
            SessionState::Error { .. } => "in error",
        }
    }

    /// The loaded document, if this state holds one.
    pub fn document(&self) -> Option<&LoadedDocument> {
        match self {
            SessionState::Ready(doc) | SessionState::Generating(doc) => Some(doc),
            SessionState::Error { document, .. } => document.as_ref(),
            SessionState::Idle | SessionState::Extracting => None,
        }
    }

    fn document_mut(&mut self) -> Option<&mut LoadedDocument> {
        match self {
            SessionState::Ready(doc) => Some(doc),
            SessionState::Error { document, .. } => document.as_mut(),
            _ => None,
        }
    }

    /// Advance the state machine. On an illegal transition the state is left
    /// unchanged and an error is returned.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), WorksheetError> {
        use SessionEvent as E;
        use SessionState as S;

        let current = std::mem::take(self);
        let (next, result) = match (current, event) {
            (_, E::Reset) => (S::Idle, Ok(())),

            (S::Idle | S::Ready(_) | S::Error { .. }, E::LoadStarted) => (S::Extracting, Ok(())),
            (S::Extracting, E::Loaded(doc)) => (S::Ready(doc), Ok(())),
            (S::Extracting, E::LoadFailed(message)) => (
                S::Error {
                    message,
                    document: None,
                },
                Ok(()),
            ),

            (S::Ready(doc) | S::Error { document: Some(doc), .. }, E::GenerateStarted) => {
                (S::Generating(doc), Ok(()))
            }
            (state @ (S::Idle | S::Error { document: None, .. }), E::GenerateStarted) => (
                state,
                Err(WorksheetError::NoDocumentLoaded {
                    action: "generating",
                }),
            ),
            (S::Generating(doc), E::Generated) => (S::Ready(doc), Ok(())),
            (S::Generating(doc), E::GenerateFailed(message)) => (
                S::Error {
                    message,
                    document: Some(doc),
                },
                Ok(()),
            ),

            (state, event) => {
                let err = WorksheetError::InvalidState {
                    action: event.action(),
                    state: state.name(),
                };
                (state, Err(err))
            }
        };
        *self = next;
        result
    }
}

/// What to do with the state if an in-flight load or generate is dropped.
enum OnCancel {
    /// Go back to the state from before the load started.
    Restore(SessionState),
    /// Move a `Generating` document back to `Ready`.
    KeepDocument,
}

/// Keeps the session out of `Extracting`/`Generating` when the future
/// driving it is dropped before completion (timeout, `select!`, Ctrl-C).
struct CancelGuard<'a> {
    state: &'a mut SessionState,
    on_cancel: Option<OnCancel>,
}

impl<'a> CancelGuard<'a> {
    fn new(state: &'a mut SessionState, on_cancel: OnCancel) -> Self {
        Self {
            state,
            on_cancel: Some(on_cancel),
        }
    }

    /// The operation ran to completion; nothing to undo.
    fn finish(&mut self) {
        self.on_cancel = None;
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        let Some(on_cancel) = self.on_cancel.take() else {
            return;
        };
        let current = std::mem::take(&mut *self.state);
        *self.state = match (on_cancel, current) {
            (OnCancel::Restore(previous), _) => previous,
            (OnCancel::KeepDocument, SessionState::Generating(doc)) => SessionState::Ready(doc),
            (OnCancel::KeepDocument, other) => other,
        };
        warn!("Operation cancelled; session is {}", self.state.name());
    }
}

/// Owns the configuration and state of one worksheet workflow.
#[derive(Debug)]
pub struct WorksheetSession {
    config: WorksheetConfig,
    state: SessionState,
}

impl WorksheetSession {
    pub fn new(config: WorksheetConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
        }
    }

    /// A session that starts `Ready` with an already-extracted document.
    pub fn with_document(config: WorksheetConfig, document: LoadedDocument) -> Self {
        Self {
            config,
            state: SessionState::Ready(document),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &WorksheetConfig {
        &self.config
    }

    /// Settings such as format, model or prompt may change between
    /// generations without reloading the document.
    pub fn config_mut(&mut self) -> &mut WorksheetConfig {
        &mut self.config
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.state.document()
    }

    /// One-line status text for the current state.
    pub fn status(&self) -> String {
        match &self.state {
            SessionState::Idle => "Select a PDF file to begin.".to_string(),
            SessionState::Extracting => "Extracting text from PDF...".to_string(),
            SessionState::Ready(doc) => format!(
                "{}: {} of {} pages selected",
                doc.name,
                doc.included_count(),
                doc.page_count()
            ),
            SessionState::Generating(_) => {
                format!("Generating worksheet with {}...", self.config.model)
            }
            SessionState::Error { message, .. } => format!("Error: {message}"),
        }
    }

    /// Load a PDF, replacing any previous document.
    ///
    /// A non-PDF upload is rejected before extraction and leaves the session
    /// untouched. An extraction failure moves the session to `Error` with no
    /// document. If the returned future is dropped mid-extraction the
    /// previous state is restored.
    pub async fn load(&mut self, upload: PdfUpload) -> Result<&LoadedDocument, WorksheetError> {
        upload.validate()?;
        if matches!(self.state, SessionState::Extracting | SessionState::Generating(_)) {
            return Err(WorksheetError::InvalidState {
                action: "load a PDF",
                state: self.state.name(),
            });
        }

        let previous = std::mem::take(&mut self.state);
        let mut guard = CancelGuard::new(&mut self.state, OnCancel::Restore(previous));
        guard.state.apply(SessionEvent::LoadStarted)?;
        info!("Loading {} {}", upload.name, upload.size_label());

        let result = extract_document(upload, &self.config).await;
        guard.finish();
        match result {
            Ok(doc) => guard.state.apply(SessionEvent::Loaded(doc))?,
            Err(e) => {
                warn!("Extraction failed: {}", e);
                guard.state.apply(SessionEvent::LoadFailed(e.to_string()))?;
                return Err(e);
            }
        }
        drop(guard);

        self.state
            .document()
            .ok_or_else(|| WorksheetError::Internal("document lost after load".into()))
    }

    fn document_mut(&mut self, action: &'static str) -> Result<&mut LoadedDocument, WorksheetError> {
        self.state
            .document_mut()
            .ok_or(WorksheetError::NoDocumentLoaded { action })
    }

    /// Flip one page's inclusion flag; returns the new value.
    pub fn toggle_page(&mut self, page_num: usize) -> Result<bool, WorksheetError> {
        self.document_mut("selecting pages")?.toggle_page(page_num)
    }

    pub fn select_all(&mut self) -> Result<(), WorksheetError> {
        self.document_mut("selecting pages")?.select_all();
        Ok(())
    }

    pub fn deselect_all(&mut self) -> Result<(), WorksheetError> {
        self.document_mut("selecting pages")?.deselect_all();
        Ok(())
    }

    /// Include exactly the pages in `selection`.
    pub fn apply_selection(&mut self, selection: &PageSelection) -> Result<(), WorksheetError> {
        self.document_mut("selecting pages")?.apply_selection(selection);
        Ok(())
    }

    /// Exclude the pages in `selection`, leaving the rest as they are.
    pub fn exclude_pages(&mut self, selection: &PageSelection) -> Result<(), WorksheetError> {
        self.document_mut("selecting pages")?.exclude(selection);
        Ok(())
    }

    /// Send the included pages to the model and render the result.
    ///
    /// Validation (no document, empty selection, missing API key) happens
    /// before the state changes or any request is made. Runtime failures
    /// leave the session in `Error` with the document kept, so calling
    /// `generate` again retries. Dropping the returned future mid-request
    /// puts the document back in `Ready`.
    pub async fn generate(&mut self) -> Result<GenerationOutput, WorksheetError> {
        let doc = self.state.document().ok_or(WorksheetError::NoDocumentLoaded {
            action: "generating",
        })?;
        let messages = build_messages(&self.config, doc)?;
        let client = resolve_client(&self.config)?;

        let mut guard = CancelGuard::new(&mut self.state, OnCancel::KeepDocument);
        guard.state.apply(SessionEvent::GenerateStarted)?;
        let result = match &*guard.state {
            SessionState::Generating(doc) => {
                run_generation(doc, messages, client.as_ref(), &self.config).await
            }
            other => Err(WorksheetError::InvalidState {
                action: "generate",
                state: other.name(),
            }),
        };
        guard.finish();

        match &result {
            Ok(output) => {
                info!("Worksheet ready: {}", output.document.file_name);
                guard.state.apply(SessionEvent::Generated)?;
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                guard.state.apply(SessionEvent::GenerateFailed(e.to_string()))?;
            }
        }
        result
    }

    /// Drop the document and return to `Idle`.
    pub fn reset(&mut self) {
        // Reset is legal from every state.
        let _ = self.state.apply(SessionEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::pipeline::llm::{CompletionClient, CompletionRequest, CompletionResponse};
    use crate::worksheet::Worksheet;
    use futures::future::BoxFuture;
    use std::sync::{Arc, Mutex};

    /// Replays canned results and records every request.
    struct ScriptedClient {
        results: Mutex<Vec<Result<Worksheet, WorksheetError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn new(results: Vec<Result<Worksheet, WorksheetError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl CompletionClient for ScriptedClient {
        fn complete<'a>(
            &'a self,
            request: &'a CompletionRequest,
        ) -> BoxFuture<'a, Result<CompletionResponse, WorksheetError>> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self.results.lock().unwrap().remove(0);
            Box::pin(async move {
                next.map(|worksheet| CompletionResponse {
                    worksheet,
                    raw_content: String::new(),
                    input_tokens: 10,
                    output_tokens: 20,
                })
            })
        }
    }

    fn worksheet(title: &str) -> Worksheet {
        Worksheet {
            title: Some(title.to_string()),
            ..Worksheet::default()
        }
    }

    fn doc() -> LoadedDocument {
        LoadedDocument::from_texts(
            "cells.pdf",
            ["Cells are units of life.", "Secret page.", "Membranes are selective."],
        )
    }

    fn session_with(client: Arc<ScriptedClient>, format: OutputFormat) -> WorksheetSession {
        let config = WorksheetConfig::builder()
            .client(client)
            .output_format(format)
            .build()
            .unwrap();
        WorksheetSession::with_document(config, doc())
    }

    #[test]
    fn transitions() {
        let mut s = SessionState::Idle;
        s.apply(SessionEvent::LoadStarted).unwrap();
        assert!(matches!(s, SessionState::Extracting));

        assert!(matches!(
            s.apply(SessionEvent::LoadStarted),
            Err(WorksheetError::InvalidState { state: "extracting", .. })
        ));
        assert!(matches!(s, SessionState::Extracting));

        s.apply(SessionEvent::LoadFailed("corrupt".into())).unwrap();
        assert!(matches!(s, SessionState::Error { document: None, .. }));

        assert!(matches!(
            s.apply(SessionEvent::GenerateStarted),
            Err(WorksheetError::NoDocumentLoaded { .. })
        ));

        s.apply(SessionEvent::LoadStarted).unwrap();
        s.apply(SessionEvent::Loaded(doc())).unwrap();
        s.apply(SessionEvent::GenerateStarted).unwrap();
        assert!(matches!(s, SessionState::Generating(_)));

        s.apply(SessionEvent::GenerateFailed("HTTP 500".into())).unwrap();
        assert!(s.document().is_some());
        s.apply(SessionEvent::GenerateStarted).unwrap();
        s.apply(SessionEvent::Generated).unwrap();
        assert!(matches!(s, SessionState::Ready(_)));

        s.apply(SessionEvent::Reset).unwrap();
        assert!(matches!(s, SessionState::Idle));
    }

    #[tokio::test]
    async fn generate_without_document() {
        let client = ScriptedClient::new(vec![]);
        let config = WorksheetConfig::builder().client(client.clone()).build().unwrap();
        let mut session = WorksheetSession::new(config);

        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, WorksheetError::NoDocumentLoaded { .. }));
        assert!(matches!(session.state(), SessionState::Idle));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn non_pdf_load_leaves_state_unchanged() {
        let client = ScriptedClient::new(vec![]);
        let mut session = session_with(client, OutputFormat::Docx);

        let upload = PdfUpload::from_bytes("photo.png", b"\x89PNG\r\n\x1a\n...".to_vec());
        let err = session.load(upload).await.unwrap_err();
        assert!(matches!(err, WorksheetError::NotAPdf { .. }));
        assert!(err.is_validation());
        assert!(matches!(session.state(), SessionState::Ready(_)));
        assert_eq!(session.document().unwrap().name, "cells.pdf");
    }

    #[tokio::test]
    async fn excluded_pages_never_reach_the_model() {
        let client = ScriptedClient::new(vec![Ok(worksheet("Cells"))]);
        let mut session = session_with(client.clone(), OutputFormat::Html);

        assert!(!session.toggle_page(2).unwrap());
        let output = session.generate().await.unwrap();

        let requests = client.requests.lock().unwrap();
        let user = &requests[0].messages[1].content;
        assert!(user.contains("Cells are units of life."));
        assert!(user.contains("Membranes are selective."));
        assert!(!user.contains("Secret page."));
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert!((requests[0].temperature - 0.7).abs() < 1e-6);

        assert_eq!(output.document.file_name, "Cells.html");
        assert_eq!(output.stats.included_pages, 2);
        assert_eq!(output.stats.total_pages, 3);
        assert_eq!(output.stats.output_tokens, 20);
        assert!(matches!(session.state(), SessionState::Ready(_)));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_before_request() {
        let client = ScriptedClient::new(vec![]);
        let mut session = session_with(client.clone(), OutputFormat::Docx);
        session.deselect_all().unwrap();

        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, WorksheetError::EmptySelection));
        assert_eq!(client.calls(), 0);
        assert!(matches!(session.state(), SessionState::Ready(_)));
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected_before_request() {
        let config = WorksheetConfig::builder().api_key("   ").build().unwrap();
        let mut session = WorksheetSession::with_document(config, doc());

        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, WorksheetError::MissingApiKey));
        assert!(matches!(session.state(), SessionState::Ready(_)));
    }

    #[tokio::test]
    async fn failed_generation_is_retryable() {
        let client = ScriptedClient::new(vec![
            Err(WorksheetError::ApiError {
                status: 429,
                message: "Rate limit reached".into(),
            }),
            Ok(worksheet("Second try")),
        ]);
        let mut session = session_with(client.clone(), OutputFormat::Docx);

        let err = session.generate().await.unwrap_err();
        assert_eq!(err.to_string(), "Rate limit reached");
        assert!(matches!(
            session.state(),
            SessionState::Error { document: Some(_), .. }
        ));
        assert_eq!(session.status(), "Error: Rate limit reached");

        // The document survives, so page toggles still work.
        session.toggle_page(1).unwrap();
        session.toggle_page(1).unwrap();

        let output = session.generate().await.unwrap();
        assert_eq!(output.document.file_name, "Second try.docx");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn selection_helpers() {
        let client = ScriptedClient::new(vec![]);
        let mut session = session_with(client, OutputFormat::Docx);

        session.apply_selection(&PageSelection::Single(3)).unwrap();
        assert_eq!(session.status(), "cells.pdf: 1 of 3 pages selected");
        session.select_all().unwrap();
        session.exclude_pages(&PageSelection::Set(vec![1, 2])).unwrap();
        assert_eq!(session.document().unwrap().included_count(), 1);

        assert!(matches!(
            session.toggle_page(7),
            Err(WorksheetError::PageOutOfRange { page: 7, total: 3 })
        ));

        session.reset();
        assert!(session.document().is_none());
        assert!(matches!(
            session.select_all(),
            Err(WorksheetError::NoDocumentLoaded { .. })
        ));
        assert_eq!(session.status(), "Select a PDF file to begin.");
    }

    #[tokio::test]
    async fn regenerate_in_another_format() {
        let client = ScriptedClient::new(vec![Ok(worksheet("Cells")), Ok(worksheet("Cells"))]);
        let mut session = session_with(client, OutputFormat::Docx);

        let first = session.generate().await.unwrap();
        assert_eq!(first.document.file_name, "Cells.docx");
        assert!(matches!(session.state(), SessionState::Ready(_)));

        session.config_mut().output_format = OutputFormat::Html;
        let second = session.generate().await.unwrap();
        assert_eq!(second.document.file_name, "Cells.html");
        assert!(String::from_utf8(second.document.bytes).unwrap().contains("<h1>Cells</h1>"));
    }

    /// Never answers the first request; answers every later one.
    struct StallingClient {
        calls: Mutex<usize>,
    }

    impl CompletionClient for StallingClient {
        fn complete<'a>(
            &'a self,
            _request: &'a CompletionRequest,
        ) -> BoxFuture<'a, Result<CompletionResponse, WorksheetError>> {
            let first = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls == 1
            };
            if first {
                return Box::pin(futures::future::pending());
            }
            Box::pin(async {
                Ok(CompletionResponse {
                    worksheet: worksheet("After timeout"),
                    raw_content: String::new(),
                    input_tokens: 1,
                    output_tokens: 1,
                })
            })
        }
    }

    #[tokio::test]
    async fn cancelled_generation_keeps_document() {
        let client = Arc::new(StallingClient {
            calls: Mutex::new(0),
        });
        let config = WorksheetConfig::builder().client(client).build().unwrap();
        let mut session = WorksheetSession::with_document(config, doc());

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(50), session.generate()).await;
        assert!(timed_out.is_err());

        assert!(matches!(session.state(), SessionState::Ready(_)));
        assert_eq!(session.status(), "cells.pdf: 3 of 3 pages selected");
        assert!(!session.toggle_page(2).unwrap());

        let output = session.generate().await.unwrap();
        assert_eq!(output.document.file_name, "After timeout.docx");
    }

    #[test]
    fn cancelled_load_restores_previous_state() {
        let mut state = SessionState::Extracting;
        {
            let _guard = CancelGuard::new(&mut state, OnCancel::Restore(SessionState::Ready(doc())));
        }
        assert!(matches!(state, SessionState::Ready(_)));

        let mut state = SessionState::Extracting;
        {
            let mut guard = CancelGuard::new(&mut state, OnCancel::Restore(SessionState::Idle));
            guard.finish();
            guard.state.apply(SessionEvent::Loaded(doc())).unwrap();
        }
        assert!(matches!(state, SessionState::Ready(_)));
    }
}

