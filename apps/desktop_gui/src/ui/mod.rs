//! UI layer for desktop GUI: the single form/list window.

pub mod app;

pub use app::UserAdminApp;
