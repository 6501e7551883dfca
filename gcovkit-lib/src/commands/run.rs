//! Command dispatch logic for gcovkit

use super::{ReportArgs, process_sources};
use crate::{Host, Result};
use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use std::io::Write;

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "gcovkit", version, author, long_about = None)]
#[command(about = "Produce gcov-compatible coverage reports from .gcno and .gcda files")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    args: ReportArgs,
}

/// Parse command-line arguments and report coverage for every listed source
///
/// Argument errors, `--help` and `--version` are written to the host and end with
/// [`Host::exit`]. Once the arguments parse, the run always succeeds: problems with
/// individual sources are diagnosed on the host's error stream.
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error only if the command itself fails before any source is processed
pub fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            if e.use_stderr() {
                let _ = write!(host.error(), "{}", e.render());
            } else {
                let _ = write!(host.output(), "{}", e.render());
            }
            host.exit(e.exit_code());
            return Ok(());
        }
    };

    process_sources(host, &cli.args)
}
