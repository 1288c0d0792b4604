//! Dock door and floor slot assignment for inbound delivery routes.
//!
//! Routes are parsed from a dispatcher paste ([`parser`]), assigned to dock
//! doors and floor lanes ([`assign`]), adjusted by manual overrides, and kept
//! in a versioned, persisted board ([`store`]).

pub mod assign;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod doors;
pub mod export;
pub mod layout;
#[cfg(feature = "cli")]
pub mod logging;
pub mod parser;
pub mod render;
pub mod route;
pub mod staging;
pub mod store;
pub mod wave;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use store::{AssignmentStore, BoardState, Command, apply};
