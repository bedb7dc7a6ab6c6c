//! EmberKV - An In-Memory Key-Value Cache Server
//!
//! This is the main entry point for the EmberKV server. It parses the
//! command line, sets up logging, and hands control to the event loop.

use emberkv::server::Server;
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: emberkv::DEFAULT_HOST.to_string(),
            port: emberkv::DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("EmberKV version {}", emberkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
EmberKV - An In-Memory Key-Value Cache Server

USAGE:
    emberkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: 0.0.0.0)
    -p, --port <PORT>    Port to listen on (default: 2203)
    -v, --version        Print version information
        --help           Print this help message

EXAMPLES:
    emberkv                        # Start on 0.0.0.0:2203
    emberkv --port 2204            # Start on port 2204
    emberkv --host 127.0.0.1       # Listen on loopback only
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
        ███████╗███╗   ███╗██████╗ ███████╗██████╗ ██╗  ██╗██╗   ██╗
        ██╔════╝████╗ ████║██╔══██╗██╔════╝██╔══██╗██║ ██╔╝██║   ██║
        █████╗  ██╔████╔██║██████╔╝█████╗  ██████╔╝█████╔╝ ██║   ██║
        ██╔══╝  ██║╚██╔╝██║██╔══██╗██╔══╝  ██╔══██╗██╔═██╗ ╚██╗ ██╔╝
        ███████╗██║ ╚═╝ ██║██████╔╝███████╗██║  ██║██║  ██╗ ╚████╔╝
        ╚══════╝╚═╝     ╚═╝╚═════╝ ╚══════╝╚═╝  ╚═╝╚═╝  ╚═╝  ╚═══╝

EmberKV v{} - In-Memory Key-Value Cache Server
──────────────────────────────────────────────────────────────
Listening on {}
"#,
        emberkv::VERSION,
        config.bind_address()
    );
}

fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    let addr: SocketAddr = config.bind_address().parse()?;
    let mut server = Server::bind(addr)?;
    info!(addr = %server.local_addr()?, "cache initialized");

    server.run()?;
    Ok(())
}
