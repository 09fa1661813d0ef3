//! Execution context shared by all actions in a pipeline run.

use std::io::Write;
use std::sync::Arc;

use carton_core::{BoxCompute, BoxSpec, Error, Result, RunId};
use parking_lot::Mutex;

use crate::executor::PipelineState;
use crate::provision::Provisioner;

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// One run-scoped argument.
#[derive(Debug, Clone)]
pub enum Param {
    /// The target unit.
    Box(BoxSpec),
    /// Image to create machines from; overrides the box's own image.
    Image(String),
    /// Compute spec; overrides the box's own compute.
    Compute(BoxCompute),
}

/// Ordered run-scoped arguments. Actions declare how many they need through
/// [`Action::min_params`](crate::action::Action::min_params).
#[derive(Debug, Clone, Default)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params holding just the target box.
    pub fn for_box(unit: BoxSpec) -> Self {
        Self(vec![Param::Box(unit)])
    }

    /// Builder: append a param.
    pub fn with(mut self, param: Param) -> Self {
        self.0.push(param);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.0.iter()
    }

    /// The target box.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when no box param was supplied.
    pub fn unit(&self) -> Result<&BoxSpec> {
        self.0
            .iter()
            .find_map(|p| match p {
                Param::Box(unit) => Some(unit),
                _ => None,
            })
            .ok_or_else(|| Error::configuration("pipeline params carry no target box"))
    }

    /// Image id: an explicit image param wins over the box's image.
    pub fn image(&self) -> Option<&str> {
        let explicit = self.0.iter().find_map(|p| match p {
            Param::Image(image) => Some(image.as_str()),
            _ => None,
        });
        explicit
            .or_else(|| self.unit().ok().map(|u| u.image.as_str()))
            .filter(|image| !image.is_empty())
    }

    /// Compute spec: an explicit compute param wins over the box's compute.
    pub fn compute(&self) -> Option<&BoxCompute> {
        let explicit = self.0.iter().find_map(|p| match p {
            Param::Compute(compute) => Some(compute),
            _ => None,
        });
        explicit.or_else(|| self.unit().ok().map(|u| &u.compute))
    }
}

// ---------------------------------------------------------------------------
// ProgressWriter
// ---------------------------------------------------------------------------

/// Append-only sink for human-readable step banners.
///
/// Write failures are logged and dropped; they never fail a step.
#[derive(Clone)]
pub struct ProgressWriter {
    inner: Option<Arc<Mutex<Box<dyn Write + Send>>>>,
}

impl ProgressWriter {
    /// Wrap any writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Some(Arc::new(Mutex::new(Box::new(writer)))),
        }
    }

    /// A writer that discards everything.
    pub fn discard() -> Self {
        Self { inner: None }
    }

    /// Write raw bytes (log streams).
    pub fn write_bytes(&self, bytes: &[u8]) {
        let Some(inner) = &self.inner else {
            return;
        };
        let mut w = inner.lock();
        if let Err(e) = w.write_all(bytes).and_then(|()| w.flush()) {
            tracing::debug!("Dropped progress output: {e}");
        }
    }

    pub fn write_str(&self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// `\n---- <title> ----\n`
    pub fn banner(&self, title: &str) {
        self.write_str(&format!("\n---- {title} ----\n"));
    }

    /// ` ---> <line>\n`
    pub fn detail(&self, line: &str) {
        self.write_str(&format!(" ---> {line}\n"));
    }
}

impl Default for ProgressWriter {
    fn default() -> Self {
        Self::discard()
    }
}

impl std::fmt::Debug for ProgressWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressWriter")
            .field("attached", &self.inner.is_some())
            .finish()
    }
}

/// In-memory writer whose contents can be read back while it is shared.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// What a diagnostic record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A backward call failed; compensation carried on.
    CompensationFailed,
    /// A step swallowed an error by contract (best-effort steps).
    IgnoredError,
}

/// One thing that went wrong without failing the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub step: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Per-run diagnostics sink.
///
/// Every record is also emitted through `tracing`; keeping them here lets
/// callers (and tests) inspect a run without a global subscriber.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Mutex<Vec<DiagnosticRecord>>,
    states: Mutex<Vec<PipelineState>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed backward call.
    pub fn compensation_failed(&self, step: &str, err: &Error) {
        let err = Error::compensation(step, err);
        tracing::warn!("{err}");
        self.push(step, DiagnosticKind::CompensationFailed, err.to_string());
    }

    /// Record an error a best-effort step chose not to propagate.
    pub fn ignored(&self, step: &str, err: &Error) {
        tracing::warn!("[{step}] ignored error: {err}");
        self.push(step, DiagnosticKind::IgnoredError, err.to_string());
    }

    pub(crate) fn record_state(&self, state: PipelineState) {
        tracing::debug!("Pipeline state -> {state}");
        self.states.lock().push(state);
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().clone()
    }

    /// Records of one kind.
    pub fn records_of(&self, kind: DiagnosticKind) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// State transitions of the run, oldest first.
    pub fn states(&self) -> Vec<PipelineState> {
        self.states.lock().clone()
    }

    /// Latest state, or [`PipelineState::Pending`] if the run never started.
    pub fn state(&self) -> PipelineState {
        self.states
            .lock()
            .last()
            .copied()
            .unwrap_or(PipelineState::Pending)
    }

    fn push(&self, step: &str, kind: DiagnosticKind, message: String) {
        self.records.lock().push(DiagnosticRecord {
            step: step.to_string(),
            kind,
            message,
        });
    }
}

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// Context passed to every action of one pipeline run.
pub struct ActionContext {
    /// Identifies this run in logs and events.
    pub run_id: RunId,
    /// Run-scoped arguments.
    pub params: Params,
    /// Resolves machines and routers for the target box.
    pub provisioner: Arc<dyn Provisioner>,
    /// Caller-supplied progress stream.
    pub progress: ProgressWriter,
    /// Sink for errors that are reported but not propagated.
    pub diagnostics: Arc<Diagnostics>,
}

impl ActionContext {
    /// Create a context with a fresh run id, a discarding progress writer
    /// and an empty diagnostics sink.
    pub fn new(provisioner: Arc<dyn Provisioner>, params: Params) -> Self {
        Self {
            run_id: RunId::new(),
            params,
            provisioner,
            progress: ProgressWriter::discard(),
            diagnostics: Arc::new(Diagnostics::new()),
        }
    }

    /// Builder: attach a progress writer.
    pub fn with_progress(mut self, progress: ProgressWriter) -> Self {
        self.progress = progress;
        self
    }

    /// Builder: share a diagnostics sink with the caller.
    pub fn with_diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Builder: use a specific run id.
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("run_id", &self.run_id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_requires_box_param() {
        let params = Params::new().with(Param::Image("ubuntu".into()));
        assert!(matches!(params.unit(), Err(Error::Configuration(_))));
    }

    #[test]
    fn explicit_image_wins() {
        let unit = BoxSpec::new("web", "one").with_image("debian-12");
        let params = Params::for_box(unit.clone());
        assert_eq!(params.image(), Some("debian-12"));

        let params = Params::for_box(unit).with(Param::Image("ubuntu-24.04".into()));
        assert_eq!(params.image(), Some("ubuntu-24.04"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn empty_image_is_none() {
        let params = Params::for_box(BoxSpec::new("web", "one"));
        assert_eq!(params.image(), None);
        assert_eq!(params.compute().map(|c| c.hdd.as_str()), Some("10"));
    }

    #[test]
    fn progress_banners() {
        let buf = SharedBuffer::new();
        let progress = ProgressWriter::new(buf.clone());
        progress.banner("Adding routes to new machine");
        progress.detail("Added route to machine web [10.0.0.1]");
        assert_eq!(
            buf.contents(),
            "\n---- Adding routes to new machine ----\n ---> Added route to machine web [10.0.0.1]\n"
        );
    }

    #[test]
    fn discard_writer_accepts_writes() {
        let progress = ProgressWriter::discard();
        progress.banner("nothing to see");
        progress.write_bytes(b"bytes");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_are_swallowed() {
        let progress = ProgressWriter::new(BrokenPipe);
        progress.banner("still fine");
    }

    #[test]
    fn diagnostics_filter_by_kind() {
        let diagnostics = Diagnostics::new();
        diagnostics.ignored("remove-old-machine", &Error::machine("web", "gone"));
        diagnostics.compensation_failed("create-machine", &Error::machine("web", "busy"));
        let failed = diagnostics.records_of(DiagnosticKind::CompensationFailed);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].step, "create-machine");
        assert!(failed[0].message.contains("busy"));
        assert_eq!(diagnostics.records().len(), 2);
        assert_eq!(diagnostics.state(), PipelineState::Pending);
    }
}
