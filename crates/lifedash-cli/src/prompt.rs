//! Interactive prompts

use std::io::{self, Write};

use anyhow::{bail, Result};

/// Ask a yes/no question; `false` when stdin is not a terminal
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Read a single line for `label`.
///
/// Works with piped input too, so `echo secret | lifedash login ...` does
/// not need a terminal.
pub fn read_line(label: &str) -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        print!("{}: ", label);
        io::stdout().flush()?;
    }

    let mut input = String::new();
    let read = io::stdin().read_line(&mut input)?;
    if read == 0 {
        bail!("No {} given", label.to_lowercase());
    }
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
