//! Chat modes and message markup.

pub mod chat_mode;
pub mod text_format;
