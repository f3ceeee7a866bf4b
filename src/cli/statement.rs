//! # Statement Parsing and Execution
//!
//! The tiny line-oriented statement language served by the REPL:
//!
//! ```text
//! insert <id> <age> <field>
//! select
//! ```
//!
//! `insert` adds one row keyed by id; `select` prints every row in
//! ascending id order. Anything else is reported as unrecognized, and a
//! malformed `insert` is a syntax error. Statement failures never
//! terminate the session.

use eyre::{bail, Result};

use crate::table::{UserRow, UserTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Insert { id: u32, row: UserRow },
    Select,
}

/// Parses one input line into a statement.
pub fn prepare(input: &str) -> Result<Statement> {
    let trimmed = input.trim();
    let mut parts = trimmed.split_whitespace();

    match parts.next() {
        Some("insert") => {
            let mut field = || -> Result<u32> {
                match parts.next() {
                    Some(word) => match word.parse() {
                        Ok(value) => Ok(value),
                        Err(_) => bail!("Syntax error. Could not parse statement."),
                    },
                    None => bail!("Syntax error. Could not parse statement."),
                }
            };
            let id = field()?;
            let age = field()?;
            let fieldvar = field()?;
            if parts.next().is_some() {
                bail!("Syntax error. Could not parse statement.");
            }
            Ok(Statement::Insert {
                id,
                row: UserRow {
                    age,
                    field: fieldvar,
                },
            })
        }
        Some("select") => {
            if parts.next().is_some() {
                bail!("Syntax error. Could not parse statement.");
            }
            Ok(Statement::Select)
        }
        _ => bail!("Unrecognized keyword at start of '{}'.", trimmed),
    }
}

/// Executes a prepared statement against the table.
pub fn execute(statement: Statement, table: &mut UserTable) -> Result<()> {
    match statement {
        Statement::Insert { id, row } => {
            table.insert(id, row)?;
        }
        Statement::Select => {
            for row in table.scan()? {
                let (id, row) = row?;
                println!("id: {}, age: {}, field: {}", id, row.age, row.field);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_insert() {
        let statement = prepare("insert 1 23 456").unwrap();
        assert_eq!(
            statement,
            Statement::Insert {
                id: 1,
                row: UserRow {
                    age: 23,
                    field: 456
                }
            }
        );
    }

    #[test]
    fn parses_select() {
        assert_eq!(prepare("select").unwrap(), Statement::Select);
        assert_eq!(prepare("  select  ").unwrap(), Statement::Select);
    }

    #[test]
    fn insert_with_missing_fields_is_a_syntax_error() {
        let err = prepare("insert 1 2").unwrap_err();
        assert!(err.to_string().contains("Syntax error"));
    }

    #[test]
    fn insert_with_non_numeric_id_is_a_syntax_error() {
        let err = prepare("insert abc 2 3").unwrap_err();
        assert!(err.to_string().contains("Syntax error"));
    }

    #[test]
    fn insert_with_trailing_junk_is_a_syntax_error() {
        let err = prepare("insert 1 2 3 4").unwrap_err();
        assert!(err.to_string().contains("Syntax error"));
    }

    #[test]
    fn unknown_keyword_is_unrecognized() {
        let err = prepare("frobnicate the database").unwrap_err();
        assert!(err.to_string().contains("Unrecognized keyword"));
    }
}
