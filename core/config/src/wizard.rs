//! Interactive configuration wizard.
//!
//! Runs as its own command mode before any server work. Input and output
//! are generic so the prompts can be driven from tests.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::{Config, DEFAULT_PORT};
use muxd_common::{Error, Result};

/// Answers collected by the wizard.
#[derive(Debug)]
pub struct WizardOutcome {
    /// Newly generated configuration.
    pub config: Config,
    /// Where the user wants it saved.
    pub path: PathBuf,
}

/// Prompt for the port and the save location, then generate a config.
///
/// An empty answer picks the default shown in brackets. A port that is not
/// a number in 1..=65535 is reported and asked again.
///
/// # Errors
/// - Input ends before both questions are answered
/// - Reading or writing the console fails
pub fn run_wizard<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    default_path: &Path,
) -> Result<WizardOutcome> {
    let port = loop {
        let answer = prompt(
            &mut input,
            &mut output,
            &format!(
                "In which port the server is going to listen ? ({}) : ",
                DEFAULT_PORT
            ),
        )?;
        if answer.is_empty() {
            break DEFAULT_PORT;
        }
        match answer.parse::<u16>() {
            Ok(port) if port > 0 => break port,
            _ => writeln!(output, "Error: port must be a number between 1 and 65535")?,
        }
    };

    let answer = prompt(
        &mut input,
        &mut output,
        &format!(
            "Where do you want to save the config file ? ({}) : ",
            default_path.display()
        ),
    )?;
    let path = if answer.is_empty() {
        default_path.to_path_buf()
    } else {
        PathBuf::from(answer)
    };

    Ok(WizardOutcome {
        config: Config::generate(port),
        path,
    })
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(Error::InvalidInput(
            "Input ended before the wizard finished".to_string(),
        ));
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::TOKEN_SECRET_LEN;
    use crate::DEFAULT_TOKEN_CIPHER_SUITE;
    use std::io::Cursor;

    #[test]
    fn test_empty_answers_use_defaults() {
        let mut out = Vec::new();
        let outcome = run_wizard(Cursor::new("\n\n"), &mut out, Path::new("config.json")).unwrap();

        assert_eq!(outcome.config.port, DEFAULT_PORT);
        assert_eq!(outcome.path, PathBuf::from("config.json"));
        assert_eq!(outcome.config.token_secret.len(), TOKEN_SECRET_LEN);
        assert!(outcome
            .config
            .token_secret
            .expose()
            .chars()
            .all(|c| c.is_ascii_alphabetic()));
        assert_eq!(outcome.config.token_cipher_suite, DEFAULT_TOKEN_CIPHER_SUITE);
    }

    #[test]
    fn test_invalid_port_is_asked_again() {
        let mut out = Vec::new();
        let outcome = run_wizard(
            Cursor::new("eighty\n9091\n/tmp/muxd.json\n"),
            &mut out,
            Path::new("config.json"),
        )
        .unwrap();

        assert_eq!(outcome.config.port, 9091);
        assert_eq!(outcome.path, PathBuf::from("/tmp/muxd.json"));
        let transcript = String::from_utf8(out).unwrap();
        assert!(transcript.contains("port must be a number"));
    }

    #[test]
    fn test_eof_is_an_error() {
        let result = run_wizard(Cursor::new(""), Vec::new(), Path::new("config.json"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
