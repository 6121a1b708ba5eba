// rpcdesk workbench library: editor engine, tabs, session persistence, storage.

pub mod app;
pub mod busy;
pub mod collab;
pub mod config;
pub mod editor;
pub mod error;
pub mod history_list;
pub mod invoke;
pub mod notifications;
pub mod session;
pub mod store;
pub mod tabs;

pub use app::{Collaborators, Workbench};
pub use error::WorkbenchError;
