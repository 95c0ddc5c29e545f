//! winps - list running processes and their executable paths
//!
//! Windows-only CLI over the `winps` library.

// Stub main for non-Windows platforms
#[cfg(not(windows))]
fn main() {
    eprintln!("winps reads the Windows process snapshot and only runs on Windows.");
    std::process::exit(1);
}

#[cfg(windows)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    cli::run()
}

#[cfg(windows)]
mod cli {
    use clap::{Parser, Subcommand};
    use std::path::PathBuf;
    use tracing::{info, Level};
    use tracing_subscriber::FmtSubscriber;

    use winps::{ProcessDescriptor, ProcessDirectory, ScanConfig, Win32Kernel};

    #[derive(Parser)]
    #[command(name = "winps")]
    #[command(
        about = "List running processes and resolve their executable paths",
        long_about = None
    )]
    struct Cli {
        /// Configuration file (defaults to the per-user config path)
        #[arg(short, long, global = true)]
        config: Option<PathBuf>,

        /// Enable debug logging
        #[arg(short, long, global = true)]
        verbose: bool,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// List every running process
        List {
            /// Emit JSON instead of a table
            #[arg(long)]
            json: bool,

            /// Resolve the full executable path of each process
            #[arg(long)]
            paths: bool,
        },

        /// Look up one process by id
        Find {
            pid: u32,

            #[arg(long)]
            json: bool,
        },

        /// Show the full executable path of a process
        Path { pid: u32 },

        /// List processes with a given executable name
        Name { exe: String },

        /// Show configuration
        Config {
            /// Write the effective configuration to the config path
            #[arg(long)]
            write: bool,
        },
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let cli = Cli::parse();

        // Initialize logging
        let subscriber = FmtSubscriber::builder()
            .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;

        let config_path = cli.config.clone().unwrap_or_else(ScanConfig::default_path);
        let config = if config_path.exists() {
            info!("Loading configuration from {}", config_path.display());
            ScanConfig::load(&config_path)?
        } else {
            ScanConfig::default()
        };

        let directory = ProcessDirectory::with_config(Win32Kernel::new(), config)?;

        match cli.command {
            Commands::List { json, paths } => {
                if paths {
                    let entries = directory.list_with_paths()?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    } else {
                        print_header();
                        for entry in &entries {
                            let path = entry.data.error_message().unwrap_or(entry.data.path());
                            println!("{}  {}", row(&entry.descriptor), path);
                        }
                    }
                } else {
                    let procs = directory.list_processes()?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&procs)?);
                    } else {
                        print_header();
                        for p in &procs {
                            println!("{}", row(p));
                        }
                        println!("\n{} processes", procs.len());
                    }
                }
            }

            Commands::Find { pid, json } => match directory.find_process(pid)? {
                Some(p) if json => println!("{}", serde_json::to_string_pretty(&p)?),
                Some(p) => {
                    print_header();
                    println!("{}", row(&p));
                }
                None => {
                    println!("No process with id {}", pid);
                    std::process::exit(1);
                }
            },

            Commands::Path { pid } => {
                let data = directory.process_data(pid);
                match data.into_result() {
                    Ok(path) => println!("{}", path),
                    Err(msg) => {
                        eprintln!("{} (pid {})", msg, pid);
                        std::process::exit(1);
                    }
                }
            }

            Commands::Name { exe } => {
                let procs = directory.find_by_name(&exe)?;
                if procs.is_empty() {
                    println!("No process named {}", exe);
                } else {
                    print_header();
                    for p in &procs {
                        println!("{}", row(p));
                    }
                }
            }

            Commands::Config { write } => {
                println!("Configuration ({}):", config_path.display());
                println!("{}", toml::to_string_pretty(directory.config())?);
                if write {
                    directory.config().save(&config_path)?;
                    println!("Saved to {}", config_path.display());
                }
            }
        }

        Ok(())
    }

    fn print_header() {
        println!("{:>8}  {:>8}  {}", "PID", "PPID", "EXECUTABLE");
    }

    fn row(p: &ProcessDescriptor) -> String {
        format!("{:>8}  {:>8}  {}", p.pid(), p.ppid(), p.executable())
    }
}
