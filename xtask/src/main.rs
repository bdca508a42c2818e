//! Build automation tasks for osmsync
//!
//! - `generate-cli-docs`: render both binaries' flags and environment
//!   variables to `docs/cli.md` from their clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for osmsync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let importer = clap_markdown::help_markdown::<osmsync_importer::Cli>();
    let downloader = clap_markdown::help_markdown::<osmsync_downloader::Cli>();

    let content = format!(
        r#"# osmsync CLI Reference

Generated from the clap definitions on {}. Every option can also be set
through the environment variable shown next to it.

The two processes share nothing but the filesystem:

```text
osmsync-downloader --> IMPORT_QUEUE/{{start}}->-{{end}}.osc.gz --> osmsync-importer --> IMPORT_DONE/
```

## Logging

Both binaries read:

- `LOG_LEVEL` - `trace`, `debug`, `info` (default), `warn`, `error`
- `LOG_FORMAT` - `text` (default) or `json`
- `LOG_FILTER` - extra `tracing` directives, e.g. `sqlx=warn`
- `LOG_DIR` - also write a daily-rotated log file there

Warnings and errors go to stderr, everything else to stdout.

{}

{}

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        importer,
        downloader
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
