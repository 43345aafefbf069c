//! Console output: markup rendering and the terminal transport.

pub mod console;
pub mod formatter;
