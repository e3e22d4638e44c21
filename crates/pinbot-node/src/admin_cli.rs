//! pinbot-admin CLI tool
//!
//! Sends one command to a running pinbot-node and prints what it says back.
//!
//! Usage:
//!   pinbot-admin run <recipient> <command line...>
//!   pinbot-admin ping

use pinbot_node::config::admin_socket_from_env;
use pinbot_node::{AdminCommand, AdminResponse};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

const DEFAULT_IDLE_SECS: u64 = 30;

fn print_usage() {
    eprintln!("pinbot-admin - Talk to a running pinbot-node");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  pinbot-admin run <recipient> <command line...>   Run a command, e.g.");
    eprintln!("                                                 pinbot-admin run '#ops' '!pin <hash> <label>'");
    eprintln!("  pinbot-admin ping                               Check if daemon is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PINBOT_ADMIN_SOCKET      Path to admin socket, relative to PINBOT_DATA_DIR (default: admin.sock)");
    eprintln!(
        "  PINBOT_ADMIN_IDLE_SECS   Stop after this long without notifications (default: {})",
        DEFAULT_IDLE_SECS
    );
}

fn get_idle_timeout() -> Duration {
    let secs = std::env::var("PINBOT_ADMIN_IDLE_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_IDLE_SECS);
    Duration::from_secs(secs)
}

fn connect() -> Result<UnixStream, String> {
    let socket_path = admin_socket_from_env();
    UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to pinbot-node at {:?}: {}\n\
             Is the pinbot-node running?",
            socket_path, e
        )
    })
}

fn read_response(reader: &mut impl BufRead) -> Result<Option<AdminResponse>, std::io::Error> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    serde_json::from_str(&line)
        .map(Some)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, format!("Invalid response: {}", e)))
}

/// Send `cmd` and print responses. Notifications are streamed until the node has
/// been quiet for the idle timeout.
fn send_command(cmd: AdminCommand) -> Result<bool, String> {
    let mut stream = connect()?;

    let cmd_json = serde_json::to_string(&cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    stream
        .set_read_timeout(Some(get_idle_timeout()))
        .map_err(|e| e.to_string())?;
    let mut reader = BufReader::new(&stream);

    loop {
        let response = match read_response(&mut reader) {
            Ok(Some(response)) => response,
            Ok(None) => return Ok(true),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(true)
            }
            Err(e) => return Err(e.to_string()),
        };

        match response {
            AdminResponse::Pong => {
                println!("pinbot-node is running");
                return Ok(true);
            }
            AdminResponse::Accepted { command } => eprintln!("accepted: {}", command),
            AdminResponse::Notification { recipient, text } => println!("[{}] {}", recipient, text),
            AdminResponse::Ignored { line } => {
                eprintln!("Not a command: {}", line);
                return Ok(false);
            }
            AdminResponse::Error { error } => {
                eprintln!("Error: {}", error);
                return Ok(false);
            }
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = match args[1].as_str() {
        "run" => {
            if args.len() < 4 {
                eprintln!("Error: run requires a recipient and a command line");
                std::process::exit(1);
            }
            AdminCommand::Run {
                recipient: args[2].clone(),
                line: args[3..].join(" "),
            }
        }
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(cmd) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
