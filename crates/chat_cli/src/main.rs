use std::path::PathBuf;

use anyhow::{Context, Result};
use chat_cli::app::App;
use chat_cli::context::{StatsSummarizer, WorkspaceContext};
use chat_cli::terminal::{
    ExternalEditor, LinePrompter, SharedPrompter, SignalPause, WriterConsole,
};
use chat_cli::tools::ProcessExecutor;
use chat_directives::{logging, DirectiveConfig, Dispatcher, Flow, Toolbox};
use clap::Parser;
use session_store::{default_session_name, SessionStore};

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Chat session with slash-style directives", long_about = None)]
struct Cli {
    /// Conversation to resume or create. Defaults to a fresh name.
    name: Option<String>,

    /// Directory holding one subdirectory per conversation
    #[arg(long)]
    logs_dir: Option<PathBuf>,

    /// Run code without asking first
    #[arg(long)]
    no_confirm: bool,

    /// Log debug output to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = DirectiveConfig::from_env();
    if cli.logs_dir.is_some() {
        config.logs_dir = cli.logs_dir;
    }

    let root = config.resolved_logs_dir();
    let name = cli.name.unwrap_or_else(default_session_name);
    let mut store = SessionStore::open_or_create(&root, &name)
        .with_context(|| format!("opening conversation {name} under {}", root.display()))?;
    println!("Using conversation {name} ({})", store.path().display());

    let stdin = SharedPrompter::new(LinePrompter::stdio());
    let pause = SignalPause::new().context("installing interrupt handler")?;
    let tools = Toolbox {
        shell: Box::new(ProcessExecutor::shell(
            config.exec_timeout,
            Box::new(stdin.clone()),
        )),
        python: Box::new(ProcessExecutor::python(
            config.exec_timeout,
            Box::new(stdin.clone()),
        )),
        prompter: Box::new(stdin.clone()),
        editor: Box::new(ExternalEditor::new(config.editor.clone())),
        summarizer: Box::new(StatsSummarizer),
        context: Box::new(WorkspaceContext::current_dir()),
        console: Box::new(WriterConsole::stdout()),
        pause: Box::new(pause),
    };

    let dispatcher = Dispatcher::new(tools, &config);
    let mut app = App::new(dispatcher, Box::new(stdin), cli.no_confirm);
    if app.run(&mut store)? == Flow::Exit {
        std::process::exit(0);
    }

    Ok(())
}
