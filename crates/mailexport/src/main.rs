//! `mailexport` - export Exchange Online mailbox and archive folders
//!
//! Signs in with the device code flow, discovers folders through Microsoft
//! Graph or Exchange Web Services, and writes JSON and HTML reports.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod auth;
mod config;
mod files;
mod prompt;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use mailexport_core::{
    Error, EwsDirectory, ExportLimit, FolderSelector, GraphDirectory, MailDirectory,
    OutputFormat, RootSelector,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use prompt::Prompter;
use session::{ExportSettings, Session};

/// Exit code for a run interrupted with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

/// Exit code for a rejected folder or argument.
const EXIT_USAGE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    /// Microsoft Graph.
    Graph,
    /// Exchange Web Services.
    Ews,
}

/// Export Outlook mailbox folders to JSON and HTML.
#[derive(Debug, Parser)]
#[command(name = "mailexport", version, about)]
struct Cli {
    /// Mailbox address (defaults to the signed-in user).
    #[arg(short, long)]
    mailbox: Option<String>,

    /// Folder display name or path (e.g. "Inbox/Projects"); skips the menus.
    #[arg(short, long, conflicts_with = "folder_id")]
    folder: Option<String>,

    /// Folder id; skips the menus.
    #[arg(long)]
    folder_id: Option<String>,

    /// Number of emails to export, 0 for all [default: Export.DefaultCount].
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    count: Option<i64>,

    /// json, html or both [default: Export.Format].
    #[arg(long)]
    format: Option<String>,

    /// Export from the In-Place Archive (uses Exchange Web Services).
    #[arg(long, conflicts_with = "backend")]
    archive: bool,

    /// Directory API to use for the primary mailbox.
    #[arg(long, value_enum, default_value_t = BackendArg::Graph)]
    backend: BackendArg,

    /// Output directory [default: Export.OutputDir].
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Settings file (skips the appsettings.json search).
    #[arg(long)]
    config: Option<PathBuf>,

    /// List folders and exit.
    #[arg(long)]
    list_folders: bool,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn selector(&self) -> Option<FolderSelector> {
        self.folder_id
            .clone()
            .map(FolderSelector::Id)
            .or_else(|| self.folder.clone().map(FolderSelector::Name))
    }

    const fn is_interactive(&self) -> bool {
        self.folder.is_none() && self.folder_id.is_none() && !self.list_folders
    }

    const fn roots(&self) -> RootSelector {
        if self.archive {
            RootSelector::ArchiveRoot
        } else {
            RootSelector::TopLevel
        }
    }

    fn uses_ews(&self) -> bool {
        self.archive || self.backend == BackendArg::Ews
    }

    /// Validates count and format before anything touches the network.
    fn export_settings(&self, config: &Config) -> Result<ExportSettings> {
        let count = self.count.unwrap_or(config.export.default_count);
        let format: OutputFormat = self
            .format
            .as_deref()
            .unwrap_or(&config.export.format)
            .parse()?;
        Ok(ExportSettings {
            limit: ExportLimit::from_count(count)?,
            format,
        })
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "mailexport=debug,mailexport_core=debug,mailexport_oauth=debug"
    } else {
        "mailexport=info,mailexport_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    println!("Outlook Email Exporter");
    println!("======================");

    match run(cli, &cancel).await {
        Ok(()) => {
            println!("\nDone.");
            ExitCode::SUCCESS
        }
        Err(err) => report(&err),
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).await?;
    let settings = cli.export_settings(&config)?;
    info!(limit = %settings.limit, format = %settings.format, "Export settings");

    let signed_in = auth::sign_in(&config, cancel).await?;
    let mut prompter = Prompter::stdin(cancel.clone());

    let mailbox = match &cli.mailbox {
        Some(mailbox) => mailbox.trim().to_string(),
        None if cli.is_interactive() => session::choose_mailbox(&mut prompter, &signed_in).await?,
        None => signed_in.mailbox().to_string(),
    };

    let directory: Box<dyn MailDirectory> = if cli.uses_ews() {
        let ews = auth::ews_session(&signed_in).await?;
        Box::new(EwsDirectory::new(ews).with_endpoint(&config.ews.endpoint))
    } else {
        Box::new(
            GraphDirectory::new(Arc::clone(&signed_in.graph)).with_base_url(&config.graph.base_url),
        )
    };

    let session = Session {
        directory,
        mailbox,
        roots: cli.roots(),
        output_dir: cli
            .output_dir
            .clone()
            .unwrap_or_else(|| config.export.output_dir.clone()),
        cancel: cancel.clone(),
    };

    if cli.list_folders {
        session.list_folders().await
    } else if let Some(selector) = cli.selector() {
        session.export_selected(&selector, settings).await
    } else {
        session.interactive(&mut prompter, settings).await
    }
}

/// Prints `error[<category>]: <message>` and picks the exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    if let Some(core) = session::core_error(err) {
        eprintln!("error[{}]: {err:#}", core.category());
        match core {
            Error::NotAccessible { hint, .. } => eprintln!("  hint: {hint}"),
            Error::TargetNotFound { available, .. } => {
                eprintln!("  available folders:");
                for path in available {
                    eprintln!("    {path}");
                }
            }
            _ => {}
        }
        return match core {
            Error::Cancelled => ExitCode::from(EXIT_CANCELLED),
            _ if !core.is_fatal() => ExitCode::from(EXIT_USAGE),
            _ => ExitCode::FAILURE,
        };
    }

    let category = if err
        .chain()
        .any(|e| e.downcast_ref::<mailexport_oauth::Error>().is_some())
    {
        "auth_failure"
    } else {
        "config"
    };
    eprintln!("error[{category}]: {err:#}");
    ExitCode::FAILURE
}
