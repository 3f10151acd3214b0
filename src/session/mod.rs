//! Conversation and dashboard state for one dashboard view.
//!
//! `Session` is a plain value object. Every change goes through one of its
//! methods; the async orchestration lives in [`controller`].

pub mod controller;

use crate::backend::{BackendError, DashboardResponse, PromptRequest};
use crate::layout::{self, Breakpoint, LayoutItem, LayoutSet};
use crate::models::{ChartDescriptor, DerivedColumn, Kpi, Message};
use std::collections::HashSet;

pub use controller::SessionController;

pub const EMPTY_SUMMARY_REPLY: &str = "Dashboard generated.";
pub const ERROR_PREFIX: &str = "Error: ";

/// Proof that a prompt was accepted, tied to the generation it was issued in.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTicket {
    generation: u64,
    pub request: PromptRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Charts, KPIs, summary and suggestions were replaced.
    Regenerated,
    /// The request failed; the previous dashboard stays.
    Failed,
    /// The session was invalidated while the request was in flight.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    messages: Vec<Message>,
    charts: Vec<ChartDescriptor>,
    kpis: Vec<Kpi>,
    summary: String,
    suggestions: Vec<String>,
    layout: LayoutSet,
    loading: bool,
    project_name: Option<String>,
    generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            charts: Vec::new(),
            kpis: Vec::new(),
            summary: String::new(),
            suggestions: Vec::new(),
            layout: LayoutSet::default(),
            loading: false,
            project_name: None,
            generation: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn charts(&self) -> &[ChartDescriptor] {
        &self.charts
    }

    pub fn kpis(&self) -> &[Kpi] {
        &self.kpis
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn layout(&self) -> &LayoutSet {
        &self.layout
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    /// Accept a prompt for sending.
    ///
    /// Returns `None` for blank input or while another prompt is in flight;
    /// neither case touches the session. On acceptance the user message is
    /// appended and `loading` is set.
    pub fn begin_prompt(&mut self, text: &str, file_name: Option<String>) -> Option<PromptTicket> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return None;
        }
        if self.loading {
            tracing::debug!(session_id = %self.id, "prompt ignored, request in flight");
            return None;
        }

        self.messages.push(Message::user(prompt));
        self.loading = true;

        Some(PromptTicket {
            generation: self.generation,
            request: PromptRequest {
                prompt: prompt.to_string(),
                session_id: self.id.clone(),
                file_name,
            },
        })
    }

    /// Apply the backend's answer to an accepted prompt.
    pub fn complete_prompt(
        &mut self,
        ticket: PromptTicket,
        result: Result<DashboardResponse, BackendError>,
    ) -> PromptOutcome {
        if ticket.generation != self.generation {
            tracing::warn!(
                session_id = %self.id,
                ticket = ticket.generation,
                current = self.generation,
                "dropping late prompt response"
            );
            return PromptOutcome::Stale;
        }

        self.loading = false;
        match result {
            Ok(response) => {
                self.regenerate(response);
                PromptOutcome::Regenerated
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "prompt failed");
                self.messages
                    .push(Message::assistant(format!("{}{}", ERROR_PREFIX, e)));
                PromptOutcome::Failed
            }
        }
    }

    fn regenerate(&mut self, response: DashboardResponse) {
        self.charts = response.charts.unwrap_or_default();
        self.kpis = response.kpis.unwrap_or_default();
        self.summary = response.summary.unwrap_or_default();
        self.suggestions = response.suggested_prompts.unwrap_or_default();
        if response.project_name.is_some() {
            self.project_name = response.project_name;
        }
        // Manual placements belong to the previous chart set.
        self.layout = layout::synthesize(&self.charts);

        let reply = if self.summary.trim().is_empty() {
            EMPTY_SUMMARY_REPLY.to_string()
        } else {
            self.summary.clone()
        };
        self.messages.push(Message::assistant(reply));

        tracing::info!(
            session_id = %self.id,
            charts = self.charts.len(),
            kpis = self.kpis.len(),
            "dashboard regenerated"
        );
    }

    /// Note a column the expression assembler got accepted.
    pub fn record_derived_column(&mut self, column: &DerivedColumn) {
        self.messages.push(Message::assistant(format!(
            "Created column \"{}\" ({} rows). It is available in your next prompt.",
            column.name, column.total_rows
        )));
    }

    /// Store positions the host grid reported after a drag or resize.
    pub fn update_layout(&mut self, bp: Breakpoint, items: Vec<LayoutItem>) -> usize {
        let live: HashSet<String> = self.charts.iter().map(ChartDescriptor::layout_key).collect();
        self.layout.apply_change(bp, items, &live)
    }

    /// The view went away. Results of in-flight requests will be dropped.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.loading = false;
    }
}
