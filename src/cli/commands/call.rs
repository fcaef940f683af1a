//! `credvault call` — answer newline-delimited JSON requests.
//!
//! Each non-blank stdin line is one request; each gets exactly one JSON
//! response line on stdout, in order. Blank lines are skipped.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::backend::BackingStore;
use crate::bridge;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;
use crate::vault::Vault;

/// Execute the `call` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let served = serve(&vault, stdin.lock(), &mut stdout.lock())?;
    debug!(served, "Bridge input closed");
    Ok(())
}

/// Answer every request on `input`, returning how many were served.
pub fn serve<S: BackingStore>(
    vault: &Vault<S>,
    input: impl BufRead,
    output: &mut impl Write,
) -> Result<usize> {
    let mut served = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = bridge::handle(vault, line.as_bytes());
        writeln!(output, "{}", response.to_json_line())?;
        output.flush()?;
        served += 1;
    }
    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use crate::bridge::Response;
    use crate::errors::ErrorKind;

    #[test]
    fn one_response_line_per_request() {
        let vault = Vault::new(MemoryStore::new());
        let input = concat!(
            r#"{"operation":"set","namespace":"svc","key":"k","value":"djE="}"#,
            "\n\n",
            "not json\n",
            r#"{"operation":"get","namespace":"svc","key":"k"}"#,
            "\n",
        );

        let mut out = Vec::new();
        let served = serve(&vault, input.as_bytes(), &mut out).unwrap();
        assert_eq!(served, 3);

        let lines: Vec<Response> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].is_ok());
        assert_eq!(lines[1].kind(), Some(ErrorKind::InvalidArguments));
        assert!(lines[2].is_ok());
    }
}
