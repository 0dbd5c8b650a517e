mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::resolve::ResolveArgs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shellenv",
    version,
    about = "Resolve declarative environment sources into reproducible shell environments"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve sources into a shell environment for one or more platforms.
    Resolve {
        /// Target platform (e.g. x86_64-linux). Repeatable; defaults to the host.
        #[arg(long = "platform", short = 'p')]
        platforms: Vec<String>,
        /// Source document. Repeatable; later sources override earlier ones.
        #[arg(long = "source", short = 's')]
        sources: Vec<PathBuf>,
        /// Platform table to use instead of the user or built-in table.
        #[arg(long, env = "SHELLENV_PLATFORMS")]
        platforms_file: Option<PathBuf>,
        /// Ignore the library path inherited from the calling environment.
        #[arg(long, default_value_t = false)]
        no_inherit: bool,
        /// Write the resolved environments to this lock file.
        #[arg(long)]
        lock: Option<PathBuf>,
    },
    /// List supported platforms and their package catalogs.
    Platforms {
        /// Platform table to use instead of the user or built-in table.
        #[arg(long, env = "SHELLENV_PLATFORMS")]
        platforms_file: Option<PathBuf>,
    },
    /// Write a starter source document from a built-in template.
    Init {
        /// Destination path.
        #[arg(default_value = "shellenv.toml")]
        path: PathBuf,
        /// Template name (minimal, rust-stable, rust-nightly).
        #[arg(long, default_value = "minimal")]
        template: String,
        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Verify a lock file, and check it for drift when sources are given.
    VerifyLock {
        /// Path to the lock file.
        #[arg(default_value = "shellenv.lock")]
        lock: PathBuf,
        /// Source document to re-resolve against. Repeatable.
        #[arg(long = "source", short = 's')]
        sources: Vec<PathBuf>,
        /// Platform table to use instead of the user or built-in table.
        #[arg(long, env = "SHELLENV_PLATFORMS")]
        platforms_file: Option<PathBuf>,
        /// Ignore the library path inherited from the calling environment.
        #[arg(long, default_value_t = false)]
        no_inherit: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SHELLENV_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Resolve {
            platforms,
            sources,
            platforms_file,
            no_inherit,
            lock,
        } => commands::resolve::run(
            &ResolveArgs {
                platforms: &platforms,
                sources: &sources,
                platforms_file: platforms_file.as_ref(),
                inherit: !no_inherit,
                lock: lock.as_ref(),
            },
            json_output,
        ),
        Commands::Platforms { platforms_file } => {
            commands::platforms::run(platforms_file.as_ref(), json_output)
        }
        Commands::Init {
            path,
            template,
            force,
        } => commands::init::run(&path, &template, force, json_output),
        Commands::VerifyLock {
            lock,
            sources,
            platforms_file,
            no_inherit,
        } => commands::verify_lock::run(
            &lock,
            &sources,
            platforms_file.as_ref(),
            !no_inherit,
            json_output,
        ),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(commands::exit_code_for(&msg))
        }
    }
}
