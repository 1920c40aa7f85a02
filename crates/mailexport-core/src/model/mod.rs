//! Backend-agnostic data model.

mod email;
mod folder;
mod remote;
mod request;

pub use email::{BodyType, EmailAddress, EmailBody, EmailRecord, FlagInfo, Importance};
pub use folder::FolderNode;
pub use remote::{RemoteAddress, RemoteBody, RemoteFlag, RemoteMessage, RemoteRecipient};
pub use request::{ExportLimit, ExportRequest, FolderSelector, OutputFormat};
