//! Logging and other infrastructure shared by every crate in the workspace.

pub mod logging;
