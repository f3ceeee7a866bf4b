//! # Dot Command Handler
//!
//! SQLite-style dot commands for session control and introspection. Dot
//! commands start with a period and bypass the statement parser.
//!
//! | Command           | Description                       |
//! |-------------------|-----------------------------------|
//! | `.exit` / `.quit` | Flush and leave the REPL          |
//! | `.btree`          | Print the tree structure          |
//! | `.help`           | Show available commands           |

use eyre::Result;

use crate::table::UserTable;

#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    Output(String),
    Exit,
    Continue,
    Error(String),
}

pub struct CommandHandler;

impl CommandHandler {
    pub fn is_command(input: &str) -> bool {
        input.trim().starts_with('.')
    }

    pub fn execute(input: &str, table: &mut UserTable) -> Result<CommandResult> {
        let input = input.trim();
        let parts: Vec<&str> = input.split_whitespace().collect();

        if parts.is_empty() {
            return Ok(CommandResult::Continue);
        }

        let cmd = parts[0].to_lowercase();
        Ok(match cmd.as_str() {
            ".exit" | ".quit" | ".q" => CommandResult::Exit,
            ".btree" => CommandResult::Output(table.dump()?),
            ".help" | ".h" | ".?" => CommandResult::Output(help_text()),
            _ => CommandResult::Error(format!(
                "Unrecognized command '{}'. Type .help for available commands.",
                cmd
            )),
        })
    }
}

fn help_text() -> String {
    r#"keeldb commands:

  .exit, .quit, .q     Flush and exit
  .btree               Print the tree structure
  .help, .h, .?        Show this help message

Statements:

  insert <id> <age> <field>
  select

Use Ctrl+D or .exit to leave."#
        .to_string()
}
