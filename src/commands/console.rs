use super::{parse_command, Command, HELP};
use crate::backend::{AnalysisBackend, HttpBackend};
use crate::config::{Config, DatasetConfig};
use crate::expression::{ExpressionAssembler, SubmitOutcome};
use crate::layout::Breakpoint;
use crate::session::{PromptOutcome, Session, SessionController};
use crate::viz::{RenderError, RenderSurface, VisualizationAdapter};
use futures::channel::mpsc;
use futures::future::{Fuse, FusedFuture, LocalBoxFuture};
use futures::stream::FusedStream;
use futures::{FutureExt, Stream, StreamExt};
use serde_json::Value;
use std::cell::Cell;
use std::io::BufRead;
use std::pin::Pin;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::time::Sleep;

/// Chart "rendered" as a line of text.
#[derive(Debug)]
pub struct TextChart {
    pub container: String,
    pub title: String,
    pub layouts: u32,
}

/// Render surface for the console: keeps a title per container.
#[derive(Debug, Default)]
pub struct TextSurface {
    live: usize,
}

impl TextSurface {
    pub fn live(&self) -> usize {
        self.live
    }
}

impl RenderSurface for TextSurface {
    type Instance = TextChart;

    fn init(&mut self, container: &str, options: &Value) -> Result<TextChart, RenderError> {
        let title = options
            .get("title")
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("(untitled)")
            .to_string();
        self.live += 1;
        Ok(TextChart {
            container: container.to_string(),
            title,
            layouts: 1,
        })
    }

    fn resize(&mut self, instance: &mut TextChart) {
        instance.layouts += 1;
        tracing::debug!(container = %instance.container, layouts = instance.layouts, "chart re-laid out");
    }

    fn dispose(&mut self, instance: TextChart) {
        self.live = self.live.saturating_sub(1);
        tracing::debug!(container = %instance.container, "chart disposed");
    }
}

/// Stdin is blocking; read it on a helper thread and hand lines to the loop.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.unbounded_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
    });
    rx
}

fn print_dashboard(session: &Session, bp: Breakpoint) {
    if let Some(project) = session.project_name() {
        println!("== {} ==", project);
    }
    for kpi in session.kpis() {
        println!("  [{}] {}", kpi.name, kpi.display_value());
    }
    print_layout(session, bp);
    for (i, suggestion) in session.suggestions().iter().enumerate() {
        println!("  try {}: {}", i + 1, suggestion);
    }
}

fn print_layout(session: &Session, bp: Breakpoint) {
    println!("  layout ({}):", bp.as_str());
    for (item, chart) in session.layout().get(bp).iter().zip(session.charts()) {
        println!(
            "    {:<12} {:<10} x={:<2} y={:<3} {}x{}  {}",
            item.key,
            format!("{:?}", chart.chart_type).to_lowercase(),
            item.x,
            item.y,
            item.w,
            item.h,
            chart.title().unwrap_or(""),
        );
    }
}

type ResizeTimer = Fuse<Pin<Box<Sleep>>>;

/// One dashboard view driven from typed lines.
pub struct Console<B: AnalysisBackend, S: RenderSurface> {
    backend: Rc<B>,
    controller: SessionController<B, S>,
    assembler: ExpressionAssembler<B>,
    breakpoint: Cell<Breakpoint>,
}

impl<B: AnalysisBackend, S: RenderSurface> Console<B, S> {
    pub fn new(backend: Rc<B>, dataset: DatasetConfig, viz: VisualizationAdapter<S>) -> Self {
        Self {
            controller: SessionController::new(backend.clone(), dataset, viz),
            assembler: ExpressionAssembler::new(backend.clone()),
            backend,
            breakpoint: Cell::new(Breakpoint::Lg),
        }
    }

    pub fn controller(&self) -> &SessionController<B, S> {
        &self.controller
    }

    /// Process lines until the input ends or `/quit`.
    ///
    /// A prompt runs alongside further input. Prompts typed while one is in
    /// flight are dropped, not queued.
    pub async fn drive<L>(&self, mut lines: L)
    where
        L: Stream<Item = String> + FusedStream + Unpin,
    {
        let mut in_flight: Fuse<LocalBoxFuture<'_, Option<PromptOutcome>>> = Fuse::terminated();
        let mut resize_timer: ResizeTimer = Fuse::terminated();

        loop {
            futures::select_biased! {
                outcome = in_flight => self.report_prompt(outcome),
                _ = resize_timer => {
                    let relaid = self.controller.flush_resizes(Instant::now());
                    println!("{} charts re-laid out", relaid);
                    resize_timer = self.resize_timer();
                }
                line = lines.next() => {
                    let Some(line) = line else {
                        if !in_flight.is_terminated() {
                            self.report_prompt((&mut in_flight).await);
                        }
                        break;
                    };
                    match parse_command(&line) {
                        Err(usage) => println!("{}", usage),
                        Ok(Command::Quit) => break,
                        Ok(Command::Prompt(text)) => {
                            if in_flight.is_terminated() {
                                in_flight = async move { self.controller.submit_prompt(&text).await }
                                    .boxed_local()
                                    .fuse();
                            } else {
                                tracing::debug!(prompt = %text, "prompt ignored while loading");
                                println!("Still working on the previous prompt; ignored.");
                            }
                        }
                        Ok(Command::Width(px)) => {
                            let bp = Breakpoint::for_width(px);
                            self.breakpoint.set(bp);
                            println!("Breakpoint {}", bp.as_str());
                            self.controller.on_viewport_resize(Instant::now());
                            resize_timer = self.resize_timer();
                        }
                        Ok(command) => self.handle(command).await,
                    }
                }
            }
        }
    }

    fn resize_timer(&self) -> ResizeTimer {
        match self.controller.next_resize_deadline() {
            Some(deadline) => Box::pin(tokio::time::sleep_until(deadline.into())).fuse(),
            None => Fuse::terminated(),
        }
    }

    fn report_prompt(&self, outcome: Option<PromptOutcome>) {
        match outcome {
            Some(PromptOutcome::Regenerated) => {
                let session = self.controller.session();
                if let Some(reply) = session.messages().last() {
                    println!("{}", reply.content);
                }
                print_dashboard(&session, self.breakpoint.get());
            }
            Some(PromptOutcome::Failed) => {
                if let Some(reply) = self.controller.session().messages().last() {
                    println!("{}", reply.content);
                }
            }
            Some(PromptOutcome::Stale) | None => {}
        }
    }

    /// Message for the formula panel when suggestions and columns are missing.
    fn catalog_notice(&self) -> Option<String> {
        if self.assembler.columns().is_some() {
            return None;
        }
        let reason = self
            .assembler
            .last_error()
            .unwrap_or_else(|| "not loaded".to_string());
        Some(format!("Formula suggestions unavailable: {}", reason))
    }

    async fn open_formula_panel(&self) {
        self.assembler
            .activate(&self.controller.request_context())
            .await;
        if let Some(notice) = self.catalog_notice() {
            println!("{}", notice);
        }
    }

    async fn handle(&self, command: Command) {
        match command {
            Command::File(name) => {
                println!("Using file: {}", name.as_deref().unwrap_or("(default)"));
                self.controller.set_file_name(name);
            }
            Command::Files => match self.backend.list_report_files().await {
                Ok(files) if files.is_empty() => println!("No files for this report"),
                Ok(files) => {
                    for file in files {
                        println!("  {}  {}", file.file_name, file.project_name);
                    }
                }
                Err(e) => println!("Could not list files: {}", e),
            },
            Command::Column(name) => {
                self.open_formula_panel().await;
                self.assembler.pick_column(&name);
                println!("formula: {}", self.assembler.draft());
            }
            Command::Date(name) => {
                self.open_formula_panel().await;
                self.assembler.select_date_column(&name);
                println!("formula: {}", self.assembler.draft());
            }
            Command::Formula(text) => {
                self.assembler.edit_draft_manually(&text);
                println!("formula: {}", self.assembler.draft());
            }
            Command::Suggest(n) => {
                self.open_formula_panel().await;
                match self.assembler.suggestions().get(n - 1) {
                    Some(suggestion) => {
                        self.assembler.apply_suggestion(suggestion);
                        println!("formula: {}", self.assembler.draft());
                    }
                    None => println!("No suggestion {}", n),
                }
            }
            Command::Submit => {
                match self
                    .assembler
                    .submit(&self.controller.request_context())
                    .await
                {
                    SubmitOutcome::Created(column) => {
                        self.controller.accept_derived_column(&column);
                        if let Some(note) = self.controller.session().messages().last() {
                            println!("{}", note.content);
                        }
                    }
                    SubmitOutcome::Failed(description) => {
                        println!("Formula error: {}", description)
                    }
                    SubmitOutcome::Rejected | SubmitOutcome::Stale => {}
                }
            }
            Command::Layout => print_layout(&self.controller.session(), self.breakpoint.get()),
            Command::Health => match self.backend.health().await {
                Ok(health) => println!("{}: {}", health.service, health.status),
                Err(e) => println!("Backend unavailable: {}", e),
            },
            Command::Help => println!("{}", HELP),
            Command::Prompt(_) | Command::Width(_) | Command::Quit => {}
        }
    }

    /// The view is going away.
    pub fn close(&self) {
        self.assembler.close();
        self.controller.close();
    }
}

pub async fn run_console(config: &Config) {
    let backend = Rc::new(HttpBackend::new(
        config.backend.base_url.clone(),
        config.dataset.clone(),
    ));
    let delay = Duration::from_millis(config.ui.resize_debounce_ms);
    let viz = VisualizationAdapter::new(TextSurface::default(), delay);
    let console = Console::new(backend, config.dataset.clone(), viz);

    println!("{}", HELP);
    console.drive(spawn_stdin_reader()).await;
    console.close();
}
