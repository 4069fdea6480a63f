//! Wrappers around the external download engines.
//!
//! Nothing here talks to the network directly: commands are built as
//! [`ExternalCommand`] values and executed through a [`CommandRunner`].

mod runner;
pub mod soundcloud;
pub mod spotify;
mod summary;

pub use runner::{CommandRunner, ExternalCommand, SystemRunner, shell_quote};
pub use summary::DownloadSummary;
