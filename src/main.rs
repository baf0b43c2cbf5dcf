//! dupehash - concurrent duplicate file scanner
//!
//! Entry point for the dupehash CLI.

use clap::Parser;
use dupehash::{
    cli::Cli,
    error::{ExitCode, StructuredError},
};

fn main() {
    // Usage errors exit with code 2 inside clap
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match dupehash::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::for_error(&err);

            if json_errors {
                let structured = StructuredError::new(&err, exit_code);
                match serde_json::to_string_pretty(&structured) {
                    Ok(json) => eprintln!("{}", json),
                    Err(_) => eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err),
                }
            } else {
                eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
