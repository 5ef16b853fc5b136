use std::io::{self, BufRead, Write};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Ask a yes/no question on the terminal.
pub fn confirm(question: &str, default: Option<bool>) -> io::Result<bool> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    confirm_with(&mut input, &mut io::stdout(), question, default)
}

/// Repeat the question until the answer is `y` or `n`. An empty answer takes
/// the default, if there is one; end of input counts as the default or `n`.
pub fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: Option<bool>,
) -> io::Result<bool> {
    let hint = match default {
        Some(true) => " [y]",
        Some(false) => " [n]",
        None => "",
    };

    loop {
        write!(output, "{question} (y/n)?{hint}: ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match answer.trim().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            "" if default.is_some() => return Ok(default.unwrap_or(false)),
            _ => continue,
        }
    }
}
