//! Statement parsing and meta-command dispatch.
//!
//! Two small grammars sit in front of the storage engine: meta-commands
//! (`.exit`, `.constants`, `.btree`) handled directly against the `Table`,
//! and the `insert`/`select` statement grammar that goes through
//! `prepare_statement` -> `execute_statement`.

use crate::storage::{ExecuteResult, Row, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommandResult {
    Success,
    Exit,
    UnrecognizedCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareResult {
    Success,
    NegativeId,
    StringTooLong,
    SyntaxError,
    UnrecognizedStatement,
}

const USERNAME_MAX_LEN: usize = crate::storage::row::USERNAME_MAX_LEN;
const EMAIL_MAX_LEN: usize = crate::storage::row::EMAIL_MAX_LEN;

/// Runs a leading-dot command. Returns `UnrecognizedCommand` for anything
/// not listed here; the caller decides how to report that.
pub fn do_meta_command(input: &str, table: &mut Table) -> MetaCommandResult {
    match input {
        ".exit" => MetaCommandResult::Exit,
        ".constants" => {
            println!("Constants:");
            println!("{}", table.print_constants());
            MetaCommandResult::Success
        }
        ".btree" => {
            println!("Tree:");
            match table.print_tree() {
                Ok(dump) => print!("{}", dump),
                Err(e) => println!("{}", e),
            }
            MetaCommandResult::Success
        }
        _ => MetaCommandResult::UnrecognizedCommand,
    }
}

/// Tokenizes and validates a line into a `Statement`, without touching the
/// table. `insert` takes exactly three further tokens; `select` takes none.
pub fn prepare_statement(input: &str) -> (PrepareResult, Option<Statement>) {
    let mut words = input.split_whitespace();
    match words.next() {
        Some("select") => {
            if words.next().is_some() {
                return (PrepareResult::SyntaxError, None);
            }
            (PrepareResult::Success, Some(Statement::Select))
        }
        Some("insert") => {
            let rest: Vec<&str> = words.collect();
            if rest.len() != 3 {
                return (PrepareResult::SyntaxError, None);
            }
            // Anything that fails to parse as a non-negative decimal integer —
            // including non-numeric garbage, not just a literal negative sign —
            // is reported as NegativeId. See DESIGN.md's Open Question resolution.
            let id: i64 = match rest[0].parse() {
                Ok(id) if id >= 0 => id,
                _ => return (PrepareResult::NegativeId, None),
            };
            let (username, email) = (rest[1], rest[2]);
            if username.len() > USERNAME_MAX_LEN || email.len() > EMAIL_MAX_LEN {
                return (PrepareResult::StringTooLong, None);
            }
            (
                PrepareResult::Success,
                Some(Statement::Insert(Row::new(id as u32, username, email))),
            )
        }
        Some(_) => (PrepareResult::UnrecognizedStatement, None),
        None => (PrepareResult::UnrecognizedStatement, None),
    }
}

/// Runs a prepared statement against the table, printing its rows or
/// result line. Fatal storage errors propagate to the caller.
pub fn execute_statement(statement: Statement, table: &mut Table) -> Result<(), crate::errors::Error> {
    match statement {
        Statement::Insert(row) => match table.insert(row)? {
            ExecuteResult::Success => println!("Executed"),
            ExecuteResult::DuplicateKey => println!("Error: Duplicate key."),
        },
        Statement::Select => {
            for row in table.select()? {
                println!("({} {} {})", row.id, row.username, row.email);
            }
            println!("Executed");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_takes_no_further_tokens() {
        let (result, statement) = prepare_statement("select");
        assert_eq!(result, PrepareResult::Success);
        assert_eq!(statement, Some(Statement::Select));
    }

    #[test]
    fn insert_requires_exactly_three_fields() {
        let (result, _) = prepare_statement("insert 1 a");
        assert_eq!(result, PrepareResult::SyntaxError);
    }

    #[test]
    fn negative_id_is_rejected() {
        let (result, _) = prepare_statement("insert -1 user user@email.com");
        assert_eq!(result, PrepareResult::NegativeId);
    }

    #[test]
    fn non_numeric_id_is_also_reported_as_negative_id() {
        let (result, _) = prepare_statement("insert abc bob a@b.com");
        assert_eq!(result, PrepareResult::NegativeId);
    }

    #[test]
    fn overlong_username_is_rejected() {
        let long_username = "a".repeat(USERNAME_MAX_LEN + 1);
        let (result, _) = prepare_statement(&format!("insert 1 {} user@email.com", long_username));
        assert_eq!(result, PrepareResult::StringTooLong);
    }

    #[test]
    fn overlong_email_is_rejected() {
        let long_email = "a".repeat(EMAIL_MAX_LEN + 1);
        let (result, _) = prepare_statement(&format!("insert 1 user {}", long_email));
        assert_eq!(result, PrepareResult::StringTooLong);
    }

    #[test]
    fn unrecognized_keyword_is_reported() {
        let (result, _) = prepare_statement("destroy everything");
        assert_eq!(result, PrepareResult::UnrecognizedStatement);
    }
}
