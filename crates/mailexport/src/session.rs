//! Mailbox and folder selection, export, and the "export again?" loop.

use std::path::PathBuf;

use anyhow::Result;
use mailexport_core::{
    Error, ExportLimit, FolderNode, FolderSelector, MailDirectory, OutputFormat, RootSelector,
    StopPredicate, export_messages, flatten,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::auth::SignedIn;
use crate::files::{self, ExportTarget};
use crate::prompt::{Choice, Prompter};

const RULE_WIDTH: usize = 50;

/// Validated export parameters.
#[derive(Debug, Clone, Copy)]
pub struct ExportSettings {
    /// How many messages.
    pub limit: ExportLimit,
    /// Which files.
    pub format: OutputFormat,
}

/// One mailbox on one backend.
pub struct Session {
    /// Directory to read from.
    pub directory: Box<dyn MailDirectory>,
    /// Mailbox address; empty for the signed-in user.
    pub mailbox: String,
    /// Where traversal starts.
    pub roots: RootSelector,
    /// Where reports go.
    pub output_dir: PathBuf,
    /// Run-wide cancellation.
    pub cancel: CancellationToken,
}

fn banner(title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{rule}");
    println!("{title}");
    println!("{rule}");
}

/// The export error behind `err`, if there is one.
pub fn core_error(err: &anyhow::Error) -> Option<&Error> {
    err.downcast_ref::<Error>()
        .or_else(|| err.chain().find_map(|e| e.downcast_ref::<Error>()))
}

/// Whether an interactive session can carry on after `err`.
pub fn is_recoverable(err: &anyhow::Error) -> bool {
    core_error(err).is_some_and(|e| {
        matches!(
            e,
            Error::TargetNotFound { .. }
                | Error::InvalidArgument(_)
                | Error::Remote { .. }
                | Error::Http(_)
                | Error::Json(_)
                | Error::Xml(_)
        )
    })
}

/// Offers the primary mailbox or a custom address.
///
/// # Errors
///
/// Returns an error if reading the answer fails or the run is cancelled.
pub async fn choose_mailbox(prompter: &mut Prompter, signed_in: &SignedIn) -> Result<String> {
    banner("Available mailboxes");
    println!("\nNote: shared and delegated mailboxes must be entered by address.");
    println!(
        "  [1] {} ({}) - Primary",
        signed_in.display_name(),
        signed_in.mailbox()
    );
    println!("  [0] Enter custom mailbox email address");

    let answer = prompter.ask("\nSelect mailbox (enter number): ").await?;
    let mailbox = match answer.as_deref().map(Choice::parse) {
        Some(Choice::Number(0)) => prompter
            .ask("Enter mailbox email address: ")
            .await?
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| signed_in.mailbox().to_string()),
        Some(Choice::Number(1)) => signed_in.mailbox().to_string(),
        _ => {
            println!("Invalid selection, using primary mailbox.");
            signed_in.mailbox().to_string()
        }
    };
    println!("\nSelected mailbox: {mailbox}");
    Ok(mailbox)
}

impl Session {
    /// Discovers folders, stopping early when `stop` matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailbox or archive root is not accessible.
    pub async fn discover(&self, stop: Option<StopPredicate<'_>>) -> Result<Vec<FolderNode>> {
        banner(match self.roots {
            RootSelector::TopLevel => "Retrieving mail folders...",
            RootSelector::ArchiveRoot => "Retrieving archive folders...",
        });
        let folders = flatten(
            self.directory.as_ref(),
            &self.mailbox,
            self.roots,
            stop,
            &self.cancel,
        )
        .await?;
        println!("Found {} folder(s)", folders.len());
        Ok(folders)
    }

    /// Prints every folder of the mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub async fn list_folders(&self) -> Result<()> {
        let folders = self.discover(None).await?;
        print_folders(&folders);
        Ok(())
    }

    /// Exports the folder `selector` names, discovering only as far as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetNotFound`] if no folder matches, or any
    /// discovery or export failure.
    pub async fn export_selected(
        &self,
        selector: &FolderSelector,
        settings: ExportSettings,
    ) -> Result<()> {
        let stop = selector.stop_predicate();
        let folders = self.discover(Some(&stop)).await?;
        let folder = selector.resolve(&folders)?;
        self.export_folder(folder, settings).await
    }

    /// Exports one folder and writes its reports.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval, rendering or writing fails. Nothing is
    /// written in that case.
    pub async fn export_folder(&self, folder: &FolderNode, settings: ExportSettings) -> Result<()> {
        banner(&format!("Exporting emails from {}...", folder.path));
        println!("  Mailbox: {}", display_mailbox(&self.mailbox));
        println!("  Count: {}", settings.limit);

        let records = export_messages(
            self.directory.as_ref(),
            &self.mailbox,
            &folder.id,
            settings.limit,
            &self.cancel,
        )
        .await?;

        if records.is_empty() {
            println!("\nNo emails found in {}.", folder.path);
            return Ok(());
        }
        println!("\nRetrieved {} emails", records.len());

        let target = ExportTarget {
            folder: &folder.display_name,
            mailbox: display_mailbox(&self.mailbox),
            backend: self.directory.backend(),
        };
        let rendered = files::render(&records, &target, settings.format)?;
        for written in files::write_all(&self.output_dir, rendered).await? {
            println!(
                "✓ Exported {} emails to: {}",
                records.len(),
                written.path.display()
            );
            println!("  File size: {:.2} KB", written.kilobytes());
        }
        Ok(())
    }

    /// Menu-driven exports until the user is done.
    ///
    /// # Errors
    ///
    /// Returns an error on fatal failures or cancellation; recoverable
    /// failures are reported and the loop continues.
    pub async fn interactive(&self, prompter: &mut Prompter, defaults: ExportSettings) -> Result<()> {
        let folders = self.discover(None).await?;
        if folders.is_empty() {
            println!("\nNo folders found.");
            return Ok(());
        }

        loop {
            print_folders(&folders);
            let Some(answer) = prompter
                .ask("\nSelect folder (number or name, empty to quit): ")
                .await?
            else {
                break;
            };

            let outcome = match select_folder(&folders, Choice::parse(&answer)) {
                Ok(Some(folder)) => self.export_interactively(prompter, folder, defaults).await,
                Ok(None) => break,
                Err(err) => Err(err.into()),
            };
            if let Err(err) = outcome {
                if !is_recoverable(&err) {
                    return Err(err);
                }
                warn!(error = %err, "Export failed");
                println!("\nError: {err:#}");
            }

            if !prompter.confirm("\nExport another folder? (y/N): ").await? {
                break;
            }
        }
        Ok(())
    }

    async fn export_interactively(
        &self,
        prompter: &mut Prompter,
        folder: &FolderNode,
        defaults: ExportSettings,
    ) -> Result<()> {
        let question = format!(
            "Number of emails to export (0 = all) [{}]: ",
            defaults.limit
        );
        let limit = match prompter.ask(&question).await?.as_deref() {
            None | Some("") => defaults.limit,
            Some(count) => {
                let count: i64 = count.parse().map_err(|_| {
                    Error::InvalidArgument(format!("'{count}' is not a number"))
                })?;
                ExportLimit::from_count(count)?
            }
        };
        self.export_folder(
            folder,
            ExportSettings {
                limit,
                format: defaults.format,
            },
        )
        .await
    }
}

/// Resolves a menu answer. `Ok(None)` means the user is done.
fn select_folder(folders: &[FolderNode], choice: Choice) -> Result<Option<&FolderNode>, Error> {
    match choice {
        Choice::Empty => Ok(None),
        Choice::Number(n) => folders
            .get(n.wrapping_sub(1))
            .map(Some)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("choose a number between 1 and {}", folders.len()))
            }),
        Choice::Text(name) => FolderSelector::Name(name).resolve(folders).map(Some),
    }
}

fn display_mailbox(mailbox: &str) -> &str {
    if mailbox.is_empty() { "(signed-in user)" } else { mailbox }
}

fn print_folders(folders: &[FolderNode]) {
    println!();
    for (index, folder) in folders.iter().enumerate() {
        println!(
            "  [{}] {} ({} items, {} unread)",
            index + 1,
            folder.path,
            folder.total_items,
            folder.unread_items
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn folders() -> Vec<FolderNode> {
        vec![
            FolderNode::new("inbox", "Inbox"),
            FolderNode::new("projects", "Projects").nested_under("Inbox"),
        ]
    }

    #[test]
    fn test_select_by_number() {
        let folders = folders();
        let folder = select_folder(&folders, Choice::Number(2)).unwrap().unwrap();
        assert_eq!(folder.id, "projects");
        assert!(select_folder(&folders, Choice::Number(0)).is_err());
        assert!(select_folder(&folders, Choice::Number(3)).is_err());
    }

    #[test]
    fn test_select_by_name_or_path() {
        let folders = folders();
        let by_path = select_folder(&folders, Choice::Text("inbox/projects".into()))
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, "projects");

        let err = select_folder(&folders, Choice::Text("Nope".into())).unwrap_err();
        assert_eq!(err.category(), "target_not_found");
        assert!(select_folder(&folders, Choice::Empty).unwrap().is_none());
    }

    #[test]
    fn test_recoverable_errors() {
        let not_found = anyhow::Error::from(Error::TargetNotFound {
            target: "x".into(),
            available: Vec::new(),
        });
        assert!(is_recoverable(&not_found));

        let remote = anyhow::Error::from(Error::Remote {
            status: Some(500),
            message: "boom".into(),
        })
        .context("export failed");
        assert!(is_recoverable(&remote));

        assert!(!is_recoverable(&anyhow::Error::from(Error::Cancelled)));
        assert!(!is_recoverable(&anyhow::anyhow!("disk full")));
    }
}
