use super::{PromptOutcome, Session};
use crate::backend::{AnalysisBackend, RequestContext};
use crate::config::DatasetConfig;
use crate::layout::{Breakpoint, LayoutItem};
use crate::models::DerivedColumn;
use crate::viz::{RenderSurface, VisualizationAdapter};
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Instant;

/// Drives one dashboard view: sends prompts, applies results, keeps the
/// rendered charts in step with the session.
///
/// Everything runs on one event loop. The session is only borrowed between
/// suspension points, so overlapping calls see each other's `loading` flag.
pub struct SessionController<B: AnalysisBackend, S: RenderSurface> {
    backend: Rc<B>,
    dataset: RefCell<DatasetConfig>,
    session: RefCell<Session>,
    viz: RefCell<VisualizationAdapter<S>>,
}

impl<B: AnalysisBackend, S: RenderSurface> SessionController<B, S> {
    pub fn new(backend: Rc<B>, dataset: DatasetConfig, viz: VisualizationAdapter<S>) -> Self {
        Self::with_session(backend, dataset, viz, Session::new())
    }

    pub fn with_session(
        backend: Rc<B>,
        dataset: DatasetConfig,
        viz: VisualizationAdapter<S>,
        session: Session,
    ) -> Self {
        tracing::info!(session_id = %session.id(), "dashboard session opened");
        Self {
            backend,
            dataset: RefCell::new(dataset),
            session: RefCell::new(session),
            viz: RefCell::new(viz),
        }
    }

    pub fn session(&self) -> Ref<'_, Session> {
        self.session.borrow()
    }

    pub fn viz(&self) -> Ref<'_, VisualizationAdapter<S>> {
        self.viz.borrow()
    }

    pub fn request_context(&self) -> RequestContext {
        RequestContext {
            session_id: self.session.borrow().id().to_string(),
            dataset: self.dataset.borrow().clone(),
        }
    }

    pub fn set_file_name(&self, file_name: Option<String>) {
        self.dataset.borrow_mut().file_name = file_name;
    }

    /// Send a prompt and apply the result.
    ///
    /// `None` when the prompt was blank or another one is in flight; nothing
    /// is sent in that case.
    pub async fn submit_prompt(&self, text: &str) -> Option<PromptOutcome> {
        let file_name = self.dataset.borrow().file_name.clone();
        let ticket = self.session.borrow_mut().begin_prompt(text, file_name)?;

        let result = self.backend.submit_prompt(&ticket.request).await;

        let outcome = self.session.borrow_mut().complete_prompt(ticket, result);
        if outcome == PromptOutcome::Regenerated {
            let session = self.session.borrow();
            let handles = self.viz.borrow_mut().remount_all(session.charts());
            tracing::debug!(mounted = handles.len(), "charts remounted");
        }
        Some(outcome)
    }

    /// A derived column was accepted by the backend. No round trip; the next
    /// prompt sees the column through the backend's dataset.
    pub fn accept_derived_column(&self, column: &DerivedColumn) {
        self.session.borrow_mut().record_derived_column(column);
    }

    pub fn on_layout_change(&self, bp: Breakpoint, items: Vec<LayoutItem>) -> usize {
        self.session.borrow_mut().update_layout(bp, items)
    }

    pub fn on_container_resize(&self, container: &str, now: Instant) {
        self.viz.borrow_mut().notify_resize(container, now);
    }

    pub fn on_viewport_resize(&self, now: Instant) {
        self.viz.borrow_mut().notify_resize_all(now);
    }

    pub fn flush_resizes(&self, now: Instant) -> usize {
        self.viz.borrow_mut().flush_resizes(now)
    }

    /// When the next debounced re-layout is due, if any.
    pub fn next_resize_deadline(&self) -> Option<Instant> {
        self.viz.borrow().next_resize_deadline()
    }

    /// The view is going away: release every chart and ignore late replies.
    pub fn close(&self) {
        self.session.borrow_mut().invalidate();
        self.viz.borrow_mut().unmount_all();
        tracing::info!(session_id = %self.session.borrow().id(), "dashboard session closed");
    }
}
