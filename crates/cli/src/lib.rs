//! Library surface of the Vigil CLI: subcommands, the remote-code fetcher,
//! and the human-readable report printer.

pub mod commands;
pub mod fetch;
pub mod printer;
