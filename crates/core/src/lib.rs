//! `panel-core`: shared building blocks for the emoji panel client.
//!
//! This crate holds the error taxonomy, identifiers and the navigable view
//! model. It has no I/O of its own.

pub mod error;
pub mod id;
pub mod view;

pub use error::{PanelError, PanelResult};
pub use id::{EmojiId, EmojiRequestId, UserId};
pub use view::View;
