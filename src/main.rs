//! txf - send or receive exactly one file over one TCP connection

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use txf::config::Settings;
use txf::log::JournalLogger;
use txf::logger::{ConsoleLogger, FanoutLogger, Logger, TextLogger};
use txf::net::Link;
use txf::progress::TransferProgress;
use txf::session::{self, SessionConfig};
use txf::transfer::Direction;
use txf::Args;

fn main() -> Result<()> {
    // Set up Ctrl-C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // Exit immediately with 130 (128 + SIGINT)
        std::process::exit(130);
    })?;

    let args = Args::parse();
    let settings = args.settings()?;
    let config = match args.session_config(&settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    let (logger, journal) = build_logger(&config, &settings);
    let outcome = session::run(&config, &logger);

    if let Some(j) = journal {
        if let Err(e) = j.record(outcome.as_ref().map(|_| ())) {
            eprintln!("warning: could not write journal: {:#}", e);
        }
    }

    match outcome {
        Ok(report) => {
            if let Some(path) = report.saved_to {
                println!("saved {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("transfer failed ({})", e.kind());
            std::process::exit(e.exit_code());
        }
    }
}

/// Console lines always; text log, progress bar and journal when asked for
fn build_logger(
    config: &SessionConfig,
    settings: &Settings,
) -> (FanoutLogger, Option<Arc<JournalLogger>>) {
    let mut fan = FanoutLogger::new();
    fan.push(Arc::new(ConsoleLogger::new(settings.verbose)));

    if let Some(ref p) = settings.log_file {
        match TextLogger::new(p) {
            Ok(l) => fan.push(Arc::new(l)),
            Err(e) => eprintln!("warning: log file {} disabled: {}", p.display(), e),
        }
    }
    if settings.progress {
        fan.push(Arc::new(TransferProgress::new()));
    }

    let journal = settings.journal.as_ref().map(|p| {
        let direction = match config.role.direction() {
            Direction::Send => "send",
            Direction::Receive => "receive",
        };
        let link = match config.link {
            Link::Dial => "dial",
            Link::Listen => "listen",
        };
        Arc::new(JournalLogger::new(p, direction, link, &config.addr.to_string()))
    });
    if let Some(ref j) = journal {
        fan.push(j.clone() as Arc<dyn Logger>);
    }

    (fan, journal)
}
