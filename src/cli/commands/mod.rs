//! One module per subcommand, each exposing an `execute` function.

pub mod add_sites;
pub mod completions;
pub mod create_project;
pub mod list;
pub mod verify;
