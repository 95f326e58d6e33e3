#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Core of pig: resolves a command to a registry artifact, keeps that artifact
//! cached at its newest version, and hands execution to its entry file.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod paths;
pub mod pkg;
pub mod version;

pub use config::Config;
pub use dispatch::{Dispatcher, Invocation, NodeRunner, Runner};
pub use error::Error;
pub use pkg::{codes, PkgError};
pub use version::VERSION;
