//! Core library for `filedog`.
//!
//! Classifies files by sniffed content type and relocates them into
//! type-named bucket folders — on demand over an existing directory, or
//! continuously by watching filesystem events and organizing each file once
//! it has finished being written.

pub mod classify;
pub mod cli;
pub mod config;
pub mod errors;
pub mod organize;
pub mod output;
pub mod shutdown;
pub mod watch;

pub use classify::{Classification, Classifier, InferSniffer, Rule, RuleTable, Sniffer};
pub use config::{Config, LogLevel, WatchedDir};
pub use errors::FiledogError;
pub use organize::{FileRecord, OrganizeReport, Organizer, Outcome, resolve_destination};
pub use watch::{
    EngineConfig, StabilityGate, Sweep, WatchEngine, WatchRegistry, WatchStatus,
    WatchSubscription,
};
