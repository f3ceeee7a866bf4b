//! # REPL - Read-Eval-Print Loop
//!
//! The interactive loop of the CLI: reads lines with rustyline, dispatches
//! dot commands and statements, and keeps the session alive across
//! statement errors.
//!
//! ## Input Handling
//!
//! - Dot commands (`.exit`, `.btree`, `.help`) are executed immediately.
//! - Anything else is parsed as a statement (`insert`, `select`) and
//!   executed against the open table.
//!
//! Statement and command errors are printed and the loop continues; the
//! table is flushed when the session ends via `.exit`, Ctrl+D, or EOF.

use eyre::{Result, WrapErr};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::cli::commands::{CommandHandler, CommandResult};
use crate::cli::statement;
use crate::error::{error_kind, DbError};
use crate::table::UserTable;

const PROMPT: &str = "keeldb> ";

pub struct Repl {
    table: UserTable,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new(table: UserTable) -> Result<Self> {
        let editor = DefaultEditor::new().wrap_err("failed to initialize line editor")?;
        Ok(Self { table, editor })
    }

    pub fn run(mut self) -> Result<()> {
        println!("keeldb {}", env!("CARGO_PKG_VERSION"));
        println!("Type .help for usage hints.");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if !self.handle_line(&line)? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye");
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {}", err);
                    break;
                }
            }
        }

        self.table.close().wrap_err("failed to flush table on exit")
    }

    fn handle_line(&mut self, line: &str) -> Result<bool> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(true);
        }
        self.editor.add_history_entry(trimmed).ok();

        if CommandHandler::is_command(trimmed) {
            return Ok(self.execute_command(trimmed)?);
        }

        self.execute_statement(trimmed);
        Ok(true)
    }

    fn execute_command(&mut self, input: &str) -> Result<bool> {
        Ok(match CommandHandler::execute(input, &mut self.table)? {
            CommandResult::Exit => false,
            CommandResult::Output(text) => {
                print!("{}", ensure_trailing_newline(text));
                true
            }
            CommandResult::Continue => true,
            CommandResult::Error(msg) => {
                eprintln!("Error: {}", msg);
                true
            }
        })
    }

    fn execute_statement(&mut self, input: &str) {
        let statement = match statement::prepare(input) {
            Ok(statement) => statement,
            Err(err) => {
                eprintln!("{}", err);
                return;
            }
        };

        match statement::execute(statement, &mut self.table) {
            Ok(()) => println!("Executed."),
            Err(err) => match error_kind(&err) {
                Some(DbError::DuplicateKey) => eprintln!("Error: Duplicate key."),
                Some(DbError::PageOutOfBounds { .. }) => eprintln!("Error: Table full."),
                _ => eprintln!("Error: {:#}", err),
            },
        }
    }
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
