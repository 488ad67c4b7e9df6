//! Modgate - content moderation service.
//!
//! This crate provides the `modgate` binary's configuration and process
//! wiring:
//!
//! - [`config`]: command-line flags with environment fallbacks
//! - [`runtime`]: opening the stores and running the `serve` and `worker` commands
//!
//! # Usage
//!
//! ```ignore
//! use clap::Parser;
//! use modgate_app::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Command::Serve(ref args) => modgate_app::runtime::serve(&cli, args).await?,
//!     Command::Worker => modgate_app::runtime::work(&cli).await?,
//! }
//! ```

pub mod config;
pub mod runtime;

pub use config::{Cli, Command, ServeArgs};
pub use runtime::Services;
