//! sass-vars binary

use sass_vars::cli::Cli;
use sass_vars::ExtractError;
use std::process;

fn main() {
    match Cli::new().run() {
        Ok(()) => {}
        Err(ExtractError::Io(e)) => {
            eprintln!("IO Error: {}", e);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    }
}
