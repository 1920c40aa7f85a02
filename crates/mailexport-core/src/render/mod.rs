//! Report rendering.
//!
//! Both renderers are pure: they turn a slice of [`EmailRecord`]s into text
//! and leave writing it anywhere to the caller.
//!
//! [`EmailRecord`]: crate::model::EmailRecord

mod html;
mod json;

pub use html::{HtmlReport, to_html};
pub use json::{from_json, to_json};
