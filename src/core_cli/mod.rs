use clap::Parser;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "pocketftpd", about = "A small single-session FTP server.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to the persisted user settings (username, password, port)
    #[arg(short, long)]
    pub settings: Option<String>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}
