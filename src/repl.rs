//! Line-oriented REPL: prompt, read, dispatch, repeat.
//!
//! Reads plain lines from stdin rather than driving a raw-mode terminal —
//! this store has to run headless under piped input for integration tests,
//! the same contract the original `getline`-based loop offered.

use std::io::{self, BufRead, Write};

use tracing::info;

use crate::command::{self, MetaCommandResult, PrepareResult};
use crate::errors::Error;
use crate::storage::Table;

pub fn run(mut table: Table) -> Result<(), Error> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("db > ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => {
                info!("stdin closed, exiting");
                table.close()?;
                println!("Bye~");
                return Ok(());
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('.') {
            match command::do_meta_command(line, &mut table) {
                MetaCommandResult::Success => {}
                MetaCommandResult::Exit => {
                    table.close()?;
                    println!("Bye~");
                    return Ok(());
                }
                MetaCommandResult::UnrecognizedCommand => {
                    println!("Unrecognized command {}", line);
                }
            }
            continue;
        }

        let (result, statement) = command::prepare_statement(line);
        match result {
            PrepareResult::Success => {
                command::execute_statement(statement.expect("Success carries a statement"), &mut table)?;
            }
            PrepareResult::NegativeId => println!("ID must be positive"),
            PrepareResult::StringTooLong => println!("String is too long"),
            PrepareResult::SyntaxError => println!("Syntax error. Could not parse statement."),
            PrepareResult::UnrecognizedStatement => {
                println!("Unrecognized keyword at start of {}", line)
            }
        }
    }
}
