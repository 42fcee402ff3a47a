use std::io::{self, Write};

use crate::error::IdrecError;
use crate::store::ContactStore;

pub struct CLIContext<'a> {
    pub store: &'a ContactStore,
}

impl<'a> CLIContext<'a> {
    pub fn new(store: &'a ContactStore) -> Self {
        Self { store }
    }

    /// Prompt and read a line from stdin. Returns None on EOF.
    pub fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{}", prompt);
        io::stdout().flush().ok();
        let mut buf = String::new();
        match io::stdin().read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf.trim_end_matches('\n').trim_end_matches('\r').to_string()),
            Err(_) => None,
        }
    }

    /// Print a value as pretty JSON.
    pub fn print_json<T: serde::Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => self.print_error(&IdrecError::from(e)),
        }
    }

    /// Print an error.
    pub fn print_error(&self, e: &IdrecError) {
        println!("Error: {}", e);
    }
}
