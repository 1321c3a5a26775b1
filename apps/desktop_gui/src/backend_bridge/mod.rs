//! Backend worker side of the GUI: command vocabulary and the runtime that executes it.

pub mod commands;
pub mod runtime;
