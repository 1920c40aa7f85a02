//! Parameters the session layer assembles for one export.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::FolderNode;

/// How many messages to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportLimit {
    /// Every message in the folder.
    All,
    /// At most this many messages.
    AtMost(NonZeroU32),
}

impl ExportLimit {
    /// Interprets a user-supplied count: `0` means all, negative is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for negative or oversized counts.
    pub fn from_count(count: i64) -> Result<Self> {
        if count < 0 {
            return Err(Error::InvalidArgument(format!(
                "count must be 0 (all) or positive, got {count}"
            )));
        }
        let count = u32::try_from(count)
            .map_err(|_| Error::InvalidArgument(format!("count {count} is too large")))?;
        Ok(NonZeroU32::new(count).map_or(Self::All, Self::AtMost))
    }

    /// Page size to request from a backend allowing at most `max_page_size`.
    #[must_use]
    pub fn page_size(self, max_page_size: u32) -> u32 {
        match self {
            Self::All => max_page_size,
            Self::AtMost(n) => n.get().min(max_page_size),
        }
        .max(1)
    }

    /// Whether `collected` messages satisfy this limit.
    #[must_use]
    pub fn is_reached(self, collected: usize) -> bool {
        match self {
            Self::All => false,
            Self::AtMost(n) => collected >= n.get() as usize,
        }
    }
}

impl fmt::Display for ExportLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::AtMost(n) => write!(f, "{n}"),
        }
    }
}

/// Which files to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON only.
    Json,
    /// HTML only.
    Html,
    /// JSON and HTML.
    #[default]
    Both,
}

impl OutputFormat {
    /// Whether a JSON file is requested.
    #[must_use]
    pub const fn includes_json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }

    /// Whether an HTML file is requested.
    #[must_use]
    pub const fn includes_html(self) -> bool {
        matches!(self, Self::Html | Self::Both)
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "both" => Ok(Self::Both),
            other => Err(Error::InvalidArgument(format!(
                "unknown output format '{other}' (expected json, html or both)"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::Both => "both",
        })
    }
}

/// Identifies the folder to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderSelector {
    /// Exact remote folder id.
    Id(String),
    /// Display name or slash-joined path, ASCII case-insensitive.
    Name(String),
}

impl FolderSelector {
    /// Whether `folder` is the one being asked for.
    #[must_use]
    pub fn matches(&self, folder: &FolderNode) -> bool {
        match self {
            Self::Id(id) => folder.id == *id,
            Self::Name(name) => {
                let name = name.trim().trim_matches('/');
                folder.display_name.eq_ignore_ascii_case(name)
                    || folder.path.eq_ignore_ascii_case(name)
            }
        }
    }

    /// Predicate suitable for short-circuiting folder discovery.
    pub fn stop_predicate(&self) -> impl Fn(&FolderNode) -> bool + Send + Sync + '_ {
        move |folder| self.matches(folder)
    }

    /// Finds the first matching folder in discovery order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetNotFound`] listing every discovered path.
    pub fn resolve<'a>(&self, folders: &'a [FolderNode]) -> Result<&'a FolderNode> {
        folders
            .iter()
            .find(|folder| self.matches(folder))
            .ok_or_else(|| Error::TargetNotFound {
                target: self.to_string(),
                available: folders.iter().map(|f| f.path.clone()).collect(),
            })
    }
}

impl fmt::Display for FolderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Everything needed to run one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Mailbox SMTP address or UPN; empty means the signed-in user.
    pub mailbox: String,
    /// Folder to export.
    pub folder: FolderSelector,
    /// How many messages to export.
    pub limit: ExportLimit,
    /// Which files to produce.
    pub format: OutputFormat,
}

impl ExportRequest {
    /// Validates raw user input into a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a negative count or an
    /// unrecognized format, before anything touches the network.
    pub fn new(
        mailbox: impl Into<String>,
        folder: FolderSelector,
        count: i64,
        format: &str,
    ) -> Result<Self> {
        Ok(Self {
            mailbox: mailbox.into(),
            folder,
            limit: ExportLimit::from_count(count)?,
            format: format.parse()?,
        })
    }
}
