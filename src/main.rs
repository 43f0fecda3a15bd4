use camroll::commands::backup::{self, TermPrompter};
use camroll::config::Cli;
use clap::Parser;
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    camroll::logging::setup_logging(cli.verbose)?;

    let json = cli.json;
    let summary = match backup::run(cli, &mut TermPrompter::new()) {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(hint) = backup::fatal_hint(&e) {
                eprintln!("Try: {}", hint);
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    // Per-file failures leave a usable backup but still deserve a non-zero exit.
    Ok(if summary.has_failures() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}
