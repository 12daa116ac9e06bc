//! Result output on stdout.
//!
//! - **stdout**: the server's final line (or one JSON report line)
//! - **stderr**: logs, never parsed
//!
//! Lines are terminated with an explicit `\n` and flushed immediately.

use std::io::Write;

use crate::error::Result;
use crate::session::Exchange;

/// How the exchange result is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The acknowledgement line as received.
    #[default]
    Line,
    /// The whole [`Exchange`] as a single JSON object.
    Json,
}

/// Write `line` followed by a single `\n`, then flush.
pub fn write_line<W: Write + ?Sized>(out: &mut W, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Write the exchange result to `out` in the given format.
pub fn write_report<W: Write + ?Sized>(
    out: &mut W,
    exchange: &Exchange,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Line => write_line(out, &exchange.response)?,
        OutputFormat::Json => {
            let json = serde_json::to_string(exchange)?;
            write_line(out, &json)?;
        }
    }
    Ok(())
}

/// Write the exchange result to stdout.
pub fn print_report(exchange: &Exchange, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_report(&mut handle, exchange, format)
}
