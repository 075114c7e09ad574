use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gsx")]
#[command(about = "gsx script VM with native extensions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load script images and run an entry function
    Run {
        /// Script images (.gsxb), loaded in order
        #[arg(required = true)]
        paths: Vec<String>,
        /// Function to start in
        #[arg(long, default_value = "main")]
        entry: String,
        /// Report every runtime error, not only native failures
        #[arg(long)]
        developer_script: bool,
        /// Make isdedicatedserver() return true
        #[arg(long)]
        dedicated: bool,
        /// TOML file with extension settings (flags take precedence)
        #[arg(long)]
        config: Option<String>,
    },
    /// Print the debug map of a script image
    Devmap {
        /// Path to the image
        path: String,
    },
    /// Disassemble a script image
    Disassemble {
        /// Path to the image
        path: String,
    },
}
