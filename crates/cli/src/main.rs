use anyhow::Context;
use clap::{Parser, Subcommand};
use filedrop_files::{FilesService, IncomingFile};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "filedrop")]
#[command(about = "Filedrop file storage CLI")]
struct Cli {
    /// Storage directory
    #[arg(long, env = "FILEDROP_STORAGE_DIR", default_value = "./uploads")]
    storage_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a local file under a generated name
    Store {
        /// File to upload
        path: PathBuf,
        /// Declared content type (guessed from the path when omitted)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// List stored files with their sizes
    List,
    /// Delete a stored file
    Delete {
        /// Stored filename
        name: String,
    },
    /// Show a stored file's content type and size
    Show {
        /// Stored filename
        name: String,
        /// Copy the file's bytes to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("filedrop=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    run(cli, &mut io::stdout().lock())
}

fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        writeln!(out, "Use 'filedrop --help' for commands")?;
        return Ok(());
    };

    let service = FilesService::initialise(&cli.storage_dir).with_context(|| {
        format!(
            "could not initialise storage directory {}",
            cli.storage_dir.display()
        )
    })?;

    match command {
        Commands::Store { path, content_type } => {
            let stored = store_path(&service, &path, content_type)?;
            writeln!(out, "{}", stored)?;
        }
        Commands::List => {
            let files = service.list()?;
            if files.is_empty() {
                tracing::info!("No files stored in {}", service.root_directory().display());
            }
            for file in files {
                writeln!(out, "{}\t{}", file.filename, file.size)?;
            }
        }
        Commands::Delete { name } => {
            service.delete(&name)?;
            writeln!(out, "Deleted file: {}", name)?;
        }
        Commands::Show { name, output } => {
            let resolved = service.resolve(&name)?;
            writeln!(out, "{}\t{}", resolved.content_type(), resolved.size())?;

            if let Some(output) = output {
                let mut source = resolved.into_file();
                let mut target = File::create(&output)
                    .with_context(|| format!("could not create {}", output.display()))?;
                io::copy(&mut source, &mut target)?;
            }
        }
    }

    Ok(())
}

/// Stores the file at `path`, declaring its on-disk name, size and content type.
fn store_path(
    service: &FilesService,
    path: &Path,
    content_type: Option<String>,
) -> anyhow::Result<filedrop_files::StoredName> {
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let size = file.metadata()?.len();

    let original_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = content_type.or_else(|| guess_content_type(path));

    Ok(service.store(IncomingFile::new(file, original_name, size, content_type))?)
}

fn guess_content_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first_raw().map(str::to_owned)
}
