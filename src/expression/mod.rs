//! Interactive assembly of derived-column formulas.
//!
//! Clicking two date columns in a row builds `<lhs> = date_diff(a, b)`.
//! Any manual edit or applied suggestion abandons a half-finished pair.

pub mod draft;

use crate::backend::{AnalysisBackend, RequestContext};
use crate::models::{ColumnCatalog, DerivedColumn, FormulaCatalog, FormulaSuggestion};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssemblerState {
    #[default]
    Idle,
    AwaitingSecondDate {
        first: String,
    },
}

/// Draft text plus the two-click state. No I/O.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingExpression {
    draft: String,
    state: AssemblerState,
}

impl PendingExpression {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn state(&self) -> &AssemblerState {
        &self.state
    }

    pub fn pending_date_column(&self) -> Option<&str> {
        match &self.state {
            AssemblerState::Idle => None,
            AssemblerState::AwaitingSecondDate { first } => Some(first),
        }
    }

    pub fn insert_column_reference(&mut self, name: &str) {
        draft::append_token(&mut self.draft, &draft::column_token(name));
    }

    pub fn select_date_column(&mut self, name: &str) {
        let token = draft::column_token(name);
        match std::mem::take(&mut self.state) {
            AssemblerState::Idle => {
                let lhs = draft::lhs_or_default(&self.draft).to_string();
                self.draft = draft::open_date_diff(&lhs, &token);
                self.state = AssemblerState::AwaitingSecondDate { first: token };
            }
            AssemblerState::AwaitingSecondDate { first } => {
                self.draft = draft::close_open_date_diff(&self.draft, &token).unwrap_or_else(|| {
                    tracing::debug!(draft = %self.draft, "open date_diff not found, rebuilding");
                    draft::closed_date_diff(draft::lhs_or_default(&self.draft), &first, &token)
                });
            }
        }
        tracing::debug!(state = ?self.state, draft = %self.draft, "date column selected");
    }

    pub fn apply_suggestion(&mut self, suggestion: &FormulaSuggestion) {
        self.draft = format!("{} = {}", suggestion.name, suggestion.formula);
        self.state = AssemblerState::Idle;
    }

    pub fn edit_draft_manually(&mut self, text: &str) {
        self.draft = text.to_string();
        self.state = AssemblerState::Idle;
    }

    pub fn reset(&mut self) {
        self.draft.clear();
        self.state = AssemblerState::Idle;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank draft or a submission already in flight.
    Rejected,
    Created(DerivedColumn),
    /// The draft is kept for correction.
    Failed(String),
    /// The assembler was closed while the request was in flight.
    Stale,
}

/// Formula panel of one dashboard view.
pub struct ExpressionAssembler<B: AnalysisBackend> {
    backend: Rc<B>,
    pending: RefCell<PendingExpression>,
    catalog: RefCell<Option<FormulaCatalog>>,
    catalog_in_flight: Cell<bool>,
    submitting: Cell<bool>,
    last_error: RefCell<Option<String>>,
    epoch: Cell<u64>,
}

impl<B: AnalysisBackend> ExpressionAssembler<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self {
            backend,
            pending: RefCell::new(PendingExpression::default()),
            catalog: RefCell::new(None),
            catalog_in_flight: Cell::new(false),
            submitting: Cell::new(false),
            last_error: RefCell::new(None),
            epoch: Cell::new(0),
        }
    }

    pub fn draft(&self) -> String {
        self.pending.borrow().draft().to_string()
    }

    pub fn state(&self) -> AssemblerState {
        self.pending.borrow().state().clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    pub fn columns(&self) -> Option<ColumnCatalog> {
        self.catalog.borrow().as_ref().map(|c| c.columns.clone())
    }

    pub fn suggestions(&self) -> Vec<FormulaSuggestion> {
        self.catalog
            .borrow()
            .as_ref()
            .map(|c| c.suggestions.clone())
            .unwrap_or_default()
    }

    /// Load suggestions and columns the first time the panel opens.
    ///
    /// Once loaded the catalog is kept for the rest of the session. A failed
    /// fetch leaves it unloaded so the next activation tries again.
    pub async fn activate(&self, ctx: &RequestContext) -> bool {
        if self.catalog.borrow().is_some() || self.catalog_in_flight.get() {
            return false;
        }
        self.catalog_in_flight.set(true);
        let result = self
            .backend
            .fetch_formula_catalog(&ctx.catalog_request())
            .await;
        self.catalog_in_flight.set(false);

        match result {
            Ok(catalog) => {
                tracing::info!(
                    suggestions = catalog.suggestions.len(),
                    datetime = catalog.columns.datetime.len(),
                    numeric = catalog.columns.numeric.len(),
                    "formula catalog loaded"
                );
                *self.catalog.borrow_mut() = Some(catalog);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "formula catalog fetch failed");
                *self.last_error.borrow_mut() = Some(e.to_string());
                false
            }
        }
    }

    pub fn insert_column_reference(&self, name: &str) {
        self.pending.borrow_mut().insert_column_reference(name);
    }

    pub fn select_date_column(&self, name: &str) {
        self.pending.borrow_mut().select_date_column(name);
    }

    /// Route a column click: date columns feed the two-click `date_diff`,
    /// everything else is inserted as a reference.
    pub fn pick_column(&self, name: &str) {
        let is_date = self
            .catalog
            .borrow()
            .as_ref()
            .is_some_and(|c| c.columns.is_datetime(name));
        if is_date {
            self.select_date_column(name);
        } else {
            self.insert_column_reference(name);
        }
    }

    pub fn apply_suggestion(&self, suggestion: &FormulaSuggestion) {
        self.pending.borrow_mut().apply_suggestion(suggestion);
    }

    pub fn edit_draft_manually(&self, text: &str) {
        self.pending.borrow_mut().edit_draft_manually(text);
    }

    pub async fn submit(&self, ctx: &RequestContext) -> SubmitOutcome {
        let formula = self.draft();
        if formula.trim().is_empty() || self.submitting.get() {
            return SubmitOutcome::Rejected;
        }
        let Some((column, _)) = draft::parse_assignment(&formula) else {
            let description = "Expected `column name = expression`".to_string();
            *self.last_error.borrow_mut() = Some(description.clone());
            return SubmitOutcome::Failed(description);
        };

        self.submitting.set(true);
        *self.last_error.borrow_mut() = None;
        let epoch = self.epoch.get();

        tracing::debug!(column = %column, "submitting formula");
        let result = self
            .backend
            .submit_expression(&ctx.expression_request(formula.trim()))
            .await;

        if epoch != self.epoch.get() {
            tracing::warn!("dropping late formula response");
            return SubmitOutcome::Stale;
        }
        self.submitting.set(false);

        match result {
            Ok(column) => {
                tracing::info!(column = %column.name, rows = column.total_rows, "derived column created");
                self.pending.borrow_mut().reset();
                SubmitOutcome::Created(column)
            }
            Err(e) => {
                let description = e.to_string();
                tracing::warn!(error = %description, "formula rejected");
                *self.last_error.borrow_mut() = Some(description.clone());
                SubmitOutcome::Failed(description)
            }
        }
    }

    /// Close the panel: clear the draft and drop any in-flight result.
    pub fn close(&self) {
        self.epoch.set(self.epoch.get() + 1);
        self.submitting.set(false);
        self.pending.borrow_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::backend::BackendError;
    use crate::config::DatasetConfig;
    use serde_json::json;

    fn ctx() -> RequestContext {
        RequestContext {
            session_id: "s1".into(),
            dataset: DatasetConfig {
                report_type: "project-report".into(),
                report_id: "1".into(),
                file_name: Some("tasks.xlsx".into()),
            },
        }
    }

    fn catalog() -> FormulaCatalog {
        FormulaCatalog {
            suggestions: vec![FormulaSuggestion {
                name: "ratio".into(),
                formula: "a / b".into(),
                description: "Ratio of a to b".into(),
            }],
            columns: ColumnCatalog {
                datetime: vec!["Start".into(), "End".into()],
                numeric: vec!["Cost".into()],
                categorical: vec!["Region".into()],
            },
        }
    }

    #[test]
    fn test_two_date_clicks_from_empty_draft() {
        let mut p = PendingExpression::default();
        p.select_date_column("Start");
        assert_eq!(p.draft(), "Duration = date_diff(Start, ");
        assert_eq!(p.pending_date_column(), Some("Start"));
        p.select_date_column("End");
        assert_eq!(p.draft(), "Duration = date_diff(Start, End)");
        assert_eq!(p.state(), &AssemblerState::Idle);
        assert_eq!(p.pending_date_column(), None);
    }

    #[test]
    fn test_existing_lhs_is_reused() {
        let mut p = PendingExpression::default();
        p.edit_draft_manually("Lead Time = ");
        p.select_date_column("Start");
        assert_eq!(p.draft(), "Lead Time = date_diff(Start, ");
        p.select_date_column("End");
        assert_eq!(p.draft(), "Lead Time = date_diff(Start, End)");
    }

    #[test]
    fn test_fallback_rebuilds_from_remembered_first() {
        let mut p = PendingExpression::default();
        p.select_date_column("Start");
        p.insert_column_reference("Cost");
        p.select_date_column("End");
        assert_eq!(p.draft(), "Duration = date_diff(Start, End)");
        assert_eq!(p.state(), &AssemblerState::Idle);
    }

    #[test]
    fn test_manual_edit_abandons_pending_date() {
        let mut p = PendingExpression::default();
        p.select_date_column("Start");
        p.edit_draft_manually("x = y*2");
        assert_eq!(p.state(), &AssemblerState::Idle);
        assert_eq!(p.pending_date_column(), None);
        assert_eq!(p.draft(), "x = y*2");
    }

    #[test]
    fn test_suggestion_overwrites_and_resets() {
        let mut p = PendingExpression::default();
        p.select_date_column("Start");
        p.apply_suggestion(&catalog().suggestions[0]);
        assert_eq!(p.draft(), "ratio = a / b");
        assert_eq!(p.state(), &AssemblerState::Idle);
    }

    #[test]
    fn test_insert_reference_keeps_state() {
        let mut p = PendingExpression::default();
        p.edit_draft_manually("total =");
        p.insert_column_reference("Unit Price");
        assert_eq!(p.draft(), "total = `Unit Price`");
        assert_eq!(p.state(), &AssemblerState::Idle);
    }

    #[tokio::test]
    async fn test_catalog_fetched_once() {
        let backend = Rc::new(ScriptedBackend::default());
        backend.push_catalog(Ok(catalog()));
        let asm = ExpressionAssembler::new(backend.clone());

        assert!(asm.activate(&ctx()).await);
        assert!(!asm.activate(&ctx()).await);
        assert_eq!(backend.catalog_calls.get(), 1);
        assert_eq!(asm.suggestions().len(), 1);
        assert_eq!(asm.columns().unwrap().numeric, vec!["Cost".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_catalog_fetch_retries_next_time() {
        let backend = Rc::new(ScriptedBackend::default());
        backend.push_catalog(Err(BackendError::Parse("bad json".into())));
        backend.push_catalog(Ok(catalog()));
        let asm = ExpressionAssembler::new(backend.clone());

        assert!(!asm.activate(&ctx()).await);
        assert!(asm.last_error().is_some());
        assert!(asm.activate(&ctx()).await);
        assert_eq!(backend.catalog_calls.get(), 2);
    }

    #[tokio::test]
    async fn test_pick_column_routes_by_type() {
        let backend = Rc::new(ScriptedBackend::default());
        backend.push_catalog(Ok(catalog()));
        let asm = ExpressionAssembler::new(backend);
        asm.activate(&ctx()).await;

        asm.pick_column("Start");
        asm.pick_column("End");
        assert_eq!(asm.draft(), "Duration = date_diff(Start, End)");

        asm.edit_draft_manually("double =");
        asm.pick_column("Cost");
        assert_eq!(asm.draft(), "double = Cost");
    }

    #[tokio::test]
    async fn test_submit_success_clears_draft() {
        let backend = Rc::new(ScriptedBackend::default());
        backend.push_expression(Ok(DerivedColumn {
            name: "Duration".into(),
            total_rows: 50,
            sample_values: vec![json!(4), json!(7)],
        }));
        let asm = ExpressionAssembler::new(backend.clone());
        asm.select_date_column("Start");

        asm.select_date_column("End");
        let outcome = asm.submit(&ctx()).await;

        match outcome {
            SubmitOutcome::Created(col) => assert_eq!(col.total_rows, 50),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(asm.draft(), "");
        assert_eq!(asm.state(), AssemblerState::Idle);
        let sent = &backend.expression_requests.borrow()[0];
        assert_eq!(sent.formula, "Duration = date_diff(Start, End)");
        assert_eq!(sent.file_name.as_deref(), Some("tasks.xlsx"));
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_draft() {
        let backend = Rc::new(ScriptedBackend::default());
        backend.push_expression(Err(BackendError::Api {
            status: 400,
            message: "Column 'Qty' not found".into(),
        }));
        let asm = ExpressionAssembler::new(backend);
        asm.edit_draft_manually("x = Qty * 2");

        let outcome = asm.submit(&ctx()).await;
        assert_eq!(
            outcome,
            SubmitOutcome::Failed("API error: 400 - Column 'Qty' not found".into())
        );
        assert_eq!(asm.draft(), "x = Qty * 2");
        assert!(!asm.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_without_assignment_is_not_sent() {
        let backend = Rc::new(ScriptedBackend::default());
        let asm = ExpressionAssembler::new(backend.clone());
        asm.edit_draft_manually("Cost * 2");

        let outcome = asm.submit(&ctx()).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(asm.draft(), "Cost * 2");
        assert!(asm.last_error().is_some());
        assert!(!asm.is_submitting());
        assert!(backend.expression_requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_blank_and_concurrent_submit_rejected() {
        let backend = Rc::new(ScriptedBackend::default());
        backend.push_expression(Ok(DerivedColumn {
            name: "x".into(),
            total_rows: 1,
            sample_values: vec![],
        }));
        let asm = ExpressionAssembler::new(backend.clone());
        assert_eq!(asm.submit(&ctx()).await, SubmitOutcome::Rejected);

        asm.edit_draft_manually("x = a + b");
        let c = ctx();
        let (first, second) = futures::join!(asm.submit(&c), asm.submit(&c));
        assert!(matches!(first, SubmitOutcome::Created(_)));
        assert_eq!(second, SubmitOutcome::Rejected);
        assert_eq!(backend.expression_requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_close_drops_in_flight_result() {
        let backend = Rc::new(ScriptedBackend::default());
        backend.push_expression(Ok(DerivedColumn {
            name: "x".into(),
            total_rows: 1,
            sample_values: vec![],
        }));
        let asm = ExpressionAssembler::new(backend);
        asm.edit_draft_manually("x = a + b");
        let c = ctx();

        // Runs while submit is suspended inside the backend call.
        let closer = async {
            asm.close();
        };
        let (outcome, _) = futures::join!(asm.submit(&c), closer);
        assert_eq!(outcome, SubmitOutcome::Stale);
        assert_eq!(asm.draft(), "");
    }
}
