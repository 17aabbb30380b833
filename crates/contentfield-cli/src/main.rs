use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use contentfield_config::Config;
use contentfield_engine::{
    AnyField, ContentFile, ParseContext, ReaderOutput, SerializeContext, create_markdoc_config,
    io::{self, ContentEntry},
    render_html,
};
use std::{path::PathBuf, process};

/// Parse, format and render Markdoc and MDX content fields
#[derive(Parser)]
#[command(name = "contentfield", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/contentfield/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the editor document of a content file as JSON
    Parse {
        /// Path relative to the content directory
        file: String,
        #[arg(long)]
        field: String,
    },
    /// Parse and re-serialize a content file
    Format {
        file: String,
        #[arg(long)]
        field: String,
        /// Write the result (and its assets) back instead of printing it
        #[arg(long)]
        write: bool,
    },
    /// Print the read-only view of a content file
    Read {
        file: String,
        #[arg(long)]
        field: String,
    },
    /// Render a Markdoc content file to HTML
    Render {
        file: String,
        #[arg(long)]
        field: String,
    },
    /// List the directories a field may write assets into
    Directories {
        #[arg(long)]
        field: String,
    },
    /// Parse every content file of a field and report failures
    Check {
        #[arg(long)]
        field: String,
    },
}

struct Workspace {
    root: PathBuf,
    field: AnyField,
}

impl Workspace {
    fn load(config_path: Option<&PathBuf>, field: &str) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load()?,
        };
        let Some(config) = config else {
            let path = config_path.cloned().unwrap_or_else(Config::config_path);
            bail!("No configuration found at {}", path.display());
        };
        let field = config.build_field(field)?;
        Ok(Self {
            root: config.content_path,
            field,
        })
    }

    fn file(&self, path: &str) -> ContentFile {
        ContentFile::from_relative_str(path, self.field.content_extension())
    }

    fn entry(&self, file: &ContentFile) -> Result<ContentEntry> {
        io::read_entry(file, &self.root, self.field.directories())
            .with_context(|| format!("Failed to read {}", file.relative_path()))
    }

    fn parse(
        &self,
        file: &ContentFile,
        entry: &ContentEntry,
    ) -> Result<contentfield_engine::EditorState> {
        let content = std::str::from_utf8(&entry.content)
            .with_context(|| format!("{} is not valid UTF-8", file.relative_path()))?;
        let state = self.field.parse(ParseContext {
            content,
            other: &entry.other,
            external: &entry.external,
            slug: Some(file.slug()),
        })?;
        Ok(state)
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_ref();
    match cli.command {
        Commands::Parse { file, field } => {
            let ctx = Workspace::load(config, &field)?;
            let file = ctx.file(&file);
            let state = ctx.parse(&file, &ctx.entry(&file)?)?;
            println!("{}", serde_json::to_string_pretty(&state.doc)?);
        }
        Commands::Format { file, field, write } => {
            let ctx = Workspace::load(config, &field)?;
            let file = ctx.file(&file);
            let state = ctx.parse(&file, &ctx.entry(&file)?)?;
            let serialized = ctx.field.serialize(
                &state,
                SerializeContext {
                    slug: Some(file.slug()),
                },
            );
            if write {
                io::write_content(&file, &ctx.root, &serialized)?;
                log::info!("Wrote {}", file.relative_path());
            } else {
                print!("{}", String::from_utf8_lossy(&serialized.content));
            }
        }
        Commands::Read { file, field } => {
            let ctx = Workspace::load(config, &field)?;
            let file = ctx.file(&file);
            let bytes = io::read_content(&file, &ctx.root)?;
            match ctx.field.read(&bytes)? {
                ReaderOutput::Markdoc(document) => {
                    println!("{}", serde_json::to_string_pretty(&document.node)?)
                }
                ReaderOutput::Mdx(text) => print!("{text}"),
            }
        }
        Commands::Render { file, field } => {
            let ctx = Workspace::load(config, &field)?;
            let AnyField::Markdoc(markdoc) = &ctx.field else {
                bail!("render is only available for Markdoc fields");
            };
            let file = ctx.file(&file);
            let bytes = io::read_content(&file, &ctx.root)?;
            let document = markdoc.reader().parse(&bytes)?;
            let config = create_markdoc_config(markdoc.components());
            println!("{}", render_html(&document.node, &config));
        }
        Commands::Directories { field } => {
            let ctx = Workspace::load(config, &field)?;
            for directory in ctx.field.directories() {
                println!("{directory}");
            }
        }
        Commands::Check { field } => {
            let ctx = Workspace::load(config, &field)?;
            let files = io::scan_content_files(&ctx.root, ctx.field.content_extension())?;
            let mut failures = 0;
            for file in &files {
                let result = ctx
                    .entry(file)
                    .and_then(|entry| ctx.parse(file, &entry));
                if let Err(err) = result {
                    failures += 1;
                    eprintln!("{}: {err:#}", file.relative_path());
                }
            }
            println!("Checked {} files, {failures} failed", files.len());
            if failures > 0 {
                process::exit(1);
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}
