//! Interactive transaction-count prompt

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

const PROMPT: &str = "Enter number of transactions to perform: ";

/// Ask until a positive integer is entered. Fails only if input ends.
pub fn read_transaction_count<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<u32> {
    let mut line = String::new();
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            bail!("Input closed before a transaction count was entered");
        }

        match line.trim().parse::<i64>() {
            Ok(n) if n > 0 => match u32::try_from(n) {
                Ok(n) => return Ok(n),
                Err(_) => writeln!(output, "Please enter a smaller number.")?,
            },
            Ok(_) => writeln!(output, "Please enter a positive number.")?,
            Err(_) => writeln!(output, "Please enter a valid number.")?,
        }
    }
}
