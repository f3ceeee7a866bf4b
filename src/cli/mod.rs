//! # CLI Front End
//!
//! The line-oriented front end over the storage engine: a rustyline REPL,
//! a dot-command dispatcher, and the two-statement language (`insert`,
//! `select`). The CLI consumes the engine exclusively through the public
//! `Table` surface; all algorithmic work lives below it.

mod commands;
mod repl;
mod statement;

pub use commands::{CommandHandler, CommandResult};
pub use repl::Repl;
pub use statement::{execute, prepare, Statement};
