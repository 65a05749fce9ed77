use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use crate::action_executor::{perform, ActionOutcome, LaunchError, ShellLauncher};
use crate::coalescer::SlotClosed;
use crate::config::{self, ConfigError};
use crate::fetcher::{Fetcher, HttpSearchBackend};
use crate::model::{Action, PipelineState};
use crate::page::Page;
use crate::pipeline::{ResultRenderer, SearchPipeline};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("search pipeline stopped: {0}")]
    Pipeline(#[from] SlotClosed),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::from(2),
            _ => ExitCode::from(1),
        }
    }
}

/// Incremental NuGet package search.
#[derive(Debug, Clone, Parser)]
#[command(name = "nugetfind", version)]
pub struct CliOptions {
    /// Which page to search.
    #[arg(long, value_enum, default_value = "packages")]
    pub page: Page,

    /// Config file (JSON5, or TOML when the extension is .toml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run a single search, print the results and exit.
    #[arg(long, value_name = "TEXT")]
    pub query: Option<String>,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run_with_options(options: CliOptions) -> Result<ExitCode, RuntimeError> {
    let log_path = crate::logging::init(options.verbose)?;
    let cfg = config::load(options.config.as_deref())?;
    info!(
        page = ?options.page,
        endpoint = %cfg.endpoint,
        config_path = %cfg.config_path.display(),
        log_path = %log_path.display(),
        "starting"
    );

    let backend = HttpSearchBackend::new(&cfg, options.page)?;
    let profile = cfg.profile(options.page);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        match options.query {
            Some(query) => run_once(Fetcher::new(Arc::new(backend)), profile, &query).await,
            None => run_interactive(Fetcher::new(Arc::new(backend)), profile).await,
        }
    })
}

async fn run_once(
    fetcher: Fetcher,
    profile: crate::page::PageProfile,
    query: &str,
) -> Result<ExitCode, RuntimeError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let renderer = ChannelRenderer { tx };
    let pipeline = SearchPipeline::spawn(fetcher, profile, Arc::new(renderer));

    pipeline.submit(query)?;
    let state = rx.recv().await;
    pipeline.shutdown().await;

    let Some(state) = state else {
        return Ok(ExitCode::from(1));
    };
    print!("{}", format_state(&state, profile.page));
    std::io::stdout().flush()?;
    Ok(if state.is_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_interactive(
    fetcher: Fetcher,
    profile: crate::page::PageProfile,
) -> Result<ExitCode, RuntimeError> {
    let page = profile.page;
    let renderer = move |state: &PipelineState| {
        print!("{}", format_state(state, page));
        let _ = std::io::stdout().flush();
    };
    let pipeline = SearchPipeline::spawn(fetcher, profile, Arc::new(renderer));
    println!(
        "{} {} (type to search, :N or :N.M to run an action, {QUIT_COMMAND} to quit)",
        page.icon(),
        page.title()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut search_text = String::new();
    while let Some(line) = lines.next_line().await? {
        match parse_input_line(&line) {
            InputLine::Quit => break,
            InputLine::Action(selector) => {
                let state = pipeline.current_state();
                match select_action(&state, selector) {
                    Ok(action) => report_outcome(perform(action, &ShellLauncher)),
                    Err(message) => println!("{message}"),
                }
            }
            InputLine::Search(text) => {
                pipeline.update_search_text(&search_text, &text);
                search_text = text;
            }
        }
    }

    pipeline.shutdown().await;
    Ok(ExitCode::SUCCESS)
}

struct ChannelRenderer {
    tx: mpsc::UnboundedSender<Arc<PipelineState>>,
}

impl ResultRenderer for ChannelRenderer {
    fn render(&self, state: &PipelineState) {
        let _ = self.tx.send(Arc::new(state.clone()));
    }
}

fn report_outcome(outcome: Result<ActionOutcome, LaunchError>) {
    match outcome {
        Ok(ActionOutcome::Copied(text)) => println!("{text}"),
        Ok(ActionOutcome::Launched) => println!("launched"),
        Err(error) => println!("Launch error: {error}"),
    }
}

const QUIT_COMMAND: &str = ":q";

/// One line of interactive input. An empty line is a search for "".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Quit,
    Action(ActionSelector),
    Search(String),
}

pub fn parse_input_line(line: &str) -> InputLine {
    let line = line.trim_end();
    if line.trim() == QUIT_COMMAND {
        return InputLine::Quit;
    }
    match parse_action_selector(line) {
        Some(selector) => InputLine::Action(selector),
        None => InputLine::Search(line.to_string()),
    }
}

/// Which action of which item a `:N` or `:N.M` line refers to (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSelector {
    pub item: usize,
    pub secondary: Option<usize>,
}

pub fn parse_action_selector(input: &str) -> Option<ActionSelector> {
    let rest = input.trim().strip_prefix(':')?;
    let (item, secondary) = match rest.split_once('.') {
        Some((item, secondary)) => (item, Some(secondary)),
        None => (rest, None),
    };

    let item = item.trim().parse::<usize>().ok().filter(|n| *n > 0)?;
    let secondary = match secondary {
        Some(raw) => Some(raw.trim().parse::<usize>().ok().filter(|n| *n > 0)?),
        None => None,
    };
    Some(ActionSelector { item, secondary })
}

pub fn select_action(state: &PipelineState, selector: ActionSelector) -> Result<&Action, String> {
    if state.results.is_empty() {
        return Err("no result selected".to_string());
    }

    let item = state.results.get(selector.item - 1).ok_or_else(|| {
        format!(
            "selected index out of range: {} (len={})",
            selector.item,
            state.results.len()
        )
    })?;

    match selector.secondary {
        None => Ok(&item.primary),
        Some(n) => item.secondary.get(n - 1).ok_or_else(|| {
            format!(
                "action index out of range: {n} (len={})",
                item.secondary.len()
            )
        }),
    }
}

pub fn format_state(state: &PipelineState, page: Page) -> String {
    if state.results.is_empty() {
        let empty = page.empty_content(state.is_error);
        return format!("{}\n  {}\n", empty.title, empty.subtitle);
    }

    let mut out = String::new();
    for (index, item) in state.results.iter().enumerate() {
        out.push_str(&format!("{:>2}. {}  {}\n", index + 1, item.title, item.subtitle));
        for (action_index, action) in item.secondary.iter().enumerate() {
            out.push_str(&format!("      .{} {}\n", action_index + 1, action.label));
        }
    }
    out
}
