//! Chat session memory

pub mod store;

pub use store::{
    title_from_prompt, Session, SessionMessage, SessionRole, SessionStore, SessionSummary,
    DEFAULT_TITLE,
};
