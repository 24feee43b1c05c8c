use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use hunk_context::{Changeset, comment_block, context_excerpt, format_windowed, read_changeset};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hunk-context")]
#[command(about = "Diff context excerpts for inline review comments")]
struct Cli {
    /// Single-file unified diff to read (defaults to stdin)
    #[arg(long, global = true)]
    diff: Option<PathBuf>,

    /// Log extraction details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the diff excerpt for a comment range (e.g., src/main.rs:41..42 or src/main.rs:-10)
    Context {
        /// File and line reference
        comment_ref: String,
        /// Render a full notification block with this comment text
        #[arg(long)]
        comment: Option<String>,
    },
    /// Print the file as it was before the change
    Old,
    /// Print the file as it is after the change
    New,
    /// Print the new-file line number behind each line of the hunks
    Offsets,
    /// Print the changes with surrounding context lines
    Window {
        /// Lines of context around each change
        #[arg(short = 'n', long, default_value_t = 3)]
        context: usize,
    },
    /// Print paths in file-listing order (headers before implementations)
    SortKey {
        paths: Vec<String>,
    },
    /// Generate shell completions
    Completions { shell: Shell },
    /// Generate a man page
    Man,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let load = || read_changeset(cli.diff.as_deref());

    match cli.command {
        Commands::Context {
            comment_ref,
            comment,
        } => {
            let changeset = load()?;
            match comment {
                Some(body) => print!("{}", comment_block(&changeset, &comment_ref, &body)?),
                None => println!("{}", context_excerpt(&changeset, &comment_ref)?),
            }
        }
        Commands::Old => print!("{}", load()?.reconstruct_old_file()?),
        Commands::New => print!("{}", load()?.reconstruct_new_file()?),
        Commands::Offsets => {
            for (line, offset) in load()?.compute_new_file_offsets()? {
                println!("{}\t{}", line, offset);
            }
        }
        Commands::Window { context } => print!("{}", format_windowed(&load()?, context)?),
        Commands::SortKey { mut paths } => {
            paths.sort_by_cached_key(|path| Changeset::new(path.as_str()).sort_key());
            for path in paths {
                println!("{}", path);
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "hunk-context", &mut io::stdout());
        }
        Commands::Man => clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?,
    }

    Ok(())
}
