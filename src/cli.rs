//! Command-line surface and its mapping onto a session

use anyhow::Result;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::TransferError;
use crate::net::Link;
use crate::session::{Role, SessionConfig};

/// Port argument: magnitude plus whether it was written with a leading '-'
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortSpec {
    pub port: u16,
    pub flipped: bool,
}

pub fn parse_port_spec(s: &str) -> std::result::Result<PortSpec, String> {
    let (flipped, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let port = digits
        .parse::<u16>()
        .map_err(|_| format!("invalid port: {}", s))?;
    Ok(PortSpec { port, flipped })
}

/// One-shot point-to-point file transfer.
///
/// A non-negative PORT receives by dialing ADDR, or sends FILE by listening on ADDR.
/// A negative PORT flips both: receive by listening, or send FILE by dialing.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Peer address to dial, or local address to listen on
    pub addr: IpAddr,

    /// Port; a leading '-' swaps the dial/listen side
    #[arg(allow_negative_numbers = true, value_parser = parse_port_spec)]
    pub port: PortSpec,

    /// File to send; omit to receive
    pub file: Option<PathBuf>,

    /// Directory received files are written to (default: current directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Socket read/write deadline in seconds (0 = none)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Append timestamped log lines to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Append one JSON line per session to this file
    #[arg(long)]
    pub journal: Option<PathBuf>,

    /// TOML file with defaults for the options above
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print every state change and block
    #[arg(short, long)]
    pub verbose: bool,

    /// Show a byte progress bar
    #[arg(short, long)]
    pub progress: bool,
}

impl Args {
    /// Config file (if any) overlaid with the flags given here
    pub fn settings(&self) -> Result<Settings> {
        let base = match &self.config {
            Some(p) => Settings::load(p)?,
            None => Settings::default(),
        };
        Ok(base.overlay(Settings {
            dir: self.dir.clone(),
            timeout: self.timeout,
            log_file: self.log_file.clone(),
            journal: self.journal.clone(),
            verbose: self.verbose,
            progress: self.progress,
        }))
    }

    /// Sending listens and receiving dials, unless the port was negative
    pub fn link(&self) -> Link {
        match (self.port.flipped, self.file.is_some()) {
            (false, false) | (true, true) => Link::Dial,
            (false, true) | (true, false) => Link::Listen,
        }
    }

    pub fn session_config(
        &self,
        settings: &Settings,
    ) -> std::result::Result<SessionConfig, TransferError> {
        let link = self.link();
        if link == Link::Dial && self.port.port == 0 {
            return Err(TransferError::Argument("cannot dial port 0".to_string()));
        }
        let role = match &self.file {
            Some(path) => Role::Send { path: path.clone() },
            None => Role::Receive {
                dir: settings.receive_dir(),
            },
        };
        Ok(SessionConfig {
            link,
            addr: SocketAddr::new(self.addr, self.port.port),
            role,
            io_timeout: settings.io_timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["txf"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_four_role_combinations() {
        let settings = Settings::default();

        let c = parse(&["127.0.0.1", "9000"]).session_config(&settings).unwrap();
        assert_eq!(c.link, Link::Dial);
        assert!(matches!(c.role, Role::Receive { .. }));

        let c = parse(&["0.0.0.0", "9000", "report.txt"])
            .session_config(&settings)
            .unwrap();
        assert_eq!(c.link, Link::Listen);
        assert_eq!(
            c.role,
            Role::Send {
                path: PathBuf::from("report.txt")
            }
        );

        let c = parse(&["0.0.0.0", "-9000"]).session_config(&settings).unwrap();
        assert_eq!(c.link, Link::Listen);
        assert!(matches!(c.role, Role::Receive { .. }));
        assert_eq!(c.addr.port(), 9000);

        let c = parse(&["10.0.0.2", "-9000", "report.txt"])
            .session_config(&settings)
            .unwrap();
        assert_eq!(c.link, Link::Dial);
        assert!(matches!(c.role, Role::Send { .. }));
        assert_eq!(c.addr, "10.0.0.2:9000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_argument_count_enforced() {
        assert!(Args::try_parse_from(["txf", "127.0.0.1"]).is_err());
        assert!(Args::try_parse_from(["txf", "127.0.0.1", "1", "a", "b"]).is_err());
        assert!(Args::try_parse_from(["txf", "not-an-ip", "1"]).is_err());
        assert!(Args::try_parse_from(["txf", "127.0.0.1", "70000"]).is_err());
    }

    #[test]
    fn test_port_spec() {
        assert_eq!(
            parse_port_spec("-0").unwrap(),
            PortSpec {
                port: 0,
                flipped: true
            }
        );
        assert!(parse_port_spec("--5").is_err());
        assert!(parse_port_spec("").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&["127.0.0.1", "9000", "--dir", "/tmp/in", "--timeout", "5", "-v"]);
        let s = args.settings().unwrap();
        assert!(s.verbose);
        let c = args.session_config(&s).unwrap();
        assert_eq!(
            c.role,
            Role::Receive {
                dir: PathBuf::from("/tmp/in")
            }
        );
        assert_eq!(c.io_timeout, Some(std::time::Duration::from_secs(5)));
    }

    #[test]
    fn test_dial_port_zero_rejected() {
        let args = parse(&["127.0.0.1", "0"]);
        assert!(args.session_config(&Settings::default()).is_err());
    }
}
