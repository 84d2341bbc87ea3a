mod commands;
mod core;
mod graph;
mod runner;
mod ui;
mod utils;
mod workspace;

use clap::{Args, Parser, Subcommand};
use core::context::WorkspaceContext;
use core::error::{RailError, RailResult, print_error};
use runner::{CancellationToken, ProcessDispatcher};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Run tests and dev servers for exactly the workspaces a change touches
#[derive(Parser)]
#[command(name = "monorail")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Enable debug logging (MONORAIL_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Repository root (default: nearest monorepo root above the current directory)
  #[arg(long, global = true, value_name = "DIR")]
  root: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the test runner for the selected workspaces
  Test {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Only run test files matching this pattern
    #[arg(long, value_name = "PATTERN")]
    regex: Option<String>,
    /// Print the runner invocation without executing it
    #[arg(long)]
    dry_run: bool,
    /// Arguments forwarded verbatim to the runner (after `--`)
    #[arg(last = true, allow_hyphen_values = true, value_name = "RUNNER_ARGS")]
    passthrough: Vec<String>,
  },

  /// Start the dev server of an app or view
  Start {
    /// Workspace to start (prompted for when omitted)
    target: Option<String>,
    /// Print the runner invocation without executing it
    #[arg(long)]
    dry_run: bool,
    /// Arguments forwarded verbatim to the runner (after `--`)
    #[arg(last = true, allow_hyphen_values = true, value_name = "RUNNER_ARGS")]
    passthrough: Vec<String>,
  },

  /// Show which workspaces a selection covers, without running anything
  Affected {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Output format: text, json, names-only
    #[arg(short, long, default_value = "text")]
    format: String,
  },
}

/// Selection flags shared by `test` and `affected`
#[derive(Args)]
struct SelectionArgs {
  /// Workspaces to select (default: all, or the changed ones with --changed)
  targets: Vec<String>,
  /// Limit the selection to workspaces with changes
  #[arg(long)]
  changed: bool,
  /// Compare against this branch instead of the working tree (requires --changed)
  #[arg(long = "compare-branch", alias = "compareBranch", value_name = "REF")]
  compare_branch: Option<String>,
  /// Also select workspaces that depend on the selection
  #[arg(long)]
  ancestors: bool,
  /// Also select workspaces the selection depends on
  #[arg(long)]
  descendants: bool,
}

impl From<SelectionArgs> for commands::SelectionOptions {
  fn from(args: SelectionArgs) -> Self {
    Self {
      targets: args.targets,
      changed: args.changed,
      compare_branch: args.compare_branch,
      ancestors: args.ancestors,
      descendants: args.descendants,
    }
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Logs go to stderr so they never mix with command output on stdout.
fn init_tracing(verbose: bool) {
  let default = if verbose { "monorail=debug" } else { "warn" };
  let filter = EnvFilter::try_from_env("MONORAIL_LOG").unwrap_or_else(|_| EnvFilter::new(default));

  let subscriber = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .finish();

  let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Command parsed into the options the command modules take
enum Invocation {
  Test(commands::TestOptions),
  Start(commands::StartOptions),
  Affected(commands::SelectionOptions, commands::OutputFormat),
}

impl Invocation {
  /// Convert and validate CLI arguments. Runs before discovery or any git call.
  fn from_cli(command: Commands) -> RailResult<Self> {
    let invocation = match command {
      Commands::Test {
        selection,
        regex,
        dry_run,
        passthrough,
      } => {
        let opts = commands::TestOptions {
          selection: selection.into(),
          regex,
          dry_run,
          passthrough,
        };
        opts.validate()?;
        Self::Test(opts)
      }
      Commands::Start {
        target,
        dry_run,
        passthrough,
      } => Self::Start(commands::StartOptions {
        target,
        dry_run,
        passthrough,
      }),
      Commands::Affected { selection, format } => {
        let opts: commands::SelectionOptions = selection.into();
        opts.validate()?;
        Self::Affected(opts, commands::OutputFormat::parse(&format)?)
      }
    };
    Ok(invocation)
  }
}

fn run(cli: Cli) -> RailResult<i32> {
  let invocation = Invocation::from_cli(cli.command)?;

  let workspace_root = match cli.root {
    Some(root) => root,
    None => {
      let cwd = std::env::current_dir().map_err(|e| RailError::message(format!("Failed to get current directory: {}", e)))?;
      utils::find_repo_root(&cwd)
    }
  };

  // Build workspace context once (config, registry, graph)
  let ctx = WorkspaceContext::build(&workspace_root)?;
  let dispatcher = ProcessDispatcher::new();

  match invocation {
    Invocation::Test(opts) => {
      let cancel = CancellationToken::install_signal_handler()?;
      commands::run_test(&ctx, &opts, &dispatcher, &cancel)
    }
    Invocation::Start(opts) => {
      let cancel = CancellationToken::install_signal_handler()?;
      let chooser = ui::chooser::PromptChooser::new("Select a workspace to start");
      commands::run_start(&ctx, &opts, &chooser, &dispatcher, &cancel)
    }
    Invocation::Affected(opts, format) => commands::run_affected(&ctx, &opts, format).map(|()| 0),
  }
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(code) => std::process::exit(code),
    Err(err) => handle_error(err),
  }
}

fn handle_error(err: RailError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
