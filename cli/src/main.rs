use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use schema_form_core::{build_form, to_generic_pointer, to_indexed_pointer, ArrayMap, FormOptions};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "schema-form")]
#[command(about = "Build renderable form layouts from JSON Schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a form (layout, data and bookkeeping maps) from a schema
    Build {
        /// Input JSON Schema file
        input: PathBuf,

        /// Authored layout file (a JSON array; defaults to ["*"])
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Initial data file (defaults to the schema defaults)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Form options file (kebab-case JSON, e.g. {"max-depth": 10})
        #[arg(long)]
        config: Option<PathBuf>,

        /// Max synthesis depth (overrides the options file)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Do not append a submit button
        #[arg(long)]
        no_submit: bool,

        /// Write only the layout tree instead of the whole form
        #[arg(long)]
        layout_only: bool,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Translate data pointers between generic and indexed form
    Pointer {
        #[command(subcommand)]
        command: PointerCommand,
    },
}

#[derive(Subcommand)]
enum PointerCommand {
    /// Collapse list indices to `-` (`/list/3/name` → `/list/-/name`)
    Generic {
        /// Indexed data pointer
        pointer: String,

        /// Schema that declares the arrays
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Fill `-` placeholders with indices (`/list/-/name` → `/list/3/name`)
    Indexed {
        /// Generic data pointer
        pointer: String,

        /// Comma-separated indices, outermost first
        #[arg(short, long, value_delimiter = ',')]
        indices: Vec<usize>,

        /// Schema that declares the arrays; without it every `-` is filled
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            input,
            layout,
            data,
            config,
            max_depth,
            no_submit,
            layout_only,
            output,
            format,
        } => {
            let schema = read_json(&input, "schema")?;
            let layout = layout.map(|p| read_json(&p, "layout")).transpose()?;
            let data = data.map(|p| read_json(&p, "data")).transpose()?;

            let mut options = match config {
                Some(path) => serde_json::from_value::<FormOptions>(read_json(&path, "options")?)
                    .with_context(|| format!("Invalid form options in: {}", path.display()))?,
                None => FormOptions::default(),
            };
            if let Some(max_depth) = max_depth {
                options.max_depth = max_depth;
            }
            if no_submit {
                options.add_submit = false;
            }

            let form = build_form(&schema, layout.as_ref(), data.as_ref(), &options)
                .map_err(|e| anyhow::Error::from(e).context("Form build failed"))?;

            if layout_only {
                write_json(&form.layout, output.as_ref(), format)?;
            } else {
                write_json(&form, output.as_ref(), format)?;
            }
        }
        Commands::Pointer { command } => match command {
            PointerCommand::Generic { pointer, schema } => {
                check_pointer(&pointer)?;
                let map = array_map(&read_json(&schema, "schema")?);
                println!("{}", to_generic_pointer(&pointer, &map));
            }
            PointerCommand::Indexed {
                pointer,
                indices,
                schema,
            } => {
                check_pointer(&pointer)?;
                let map = schema
                    .map(|p| read_json(&p, "schema").map(|s| array_map(&s)))
                    .transpose()?;
                println!("{}", to_indexed_pointer(&pointer, &indices, map.as_ref()));
            }
        },
    }

    Ok(())
}

fn array_map(schema: &Value) -> ArrayMap {
    ArrayMap::from_schema(schema, FormOptions::default().max_depth)
}

fn check_pointer(pointer: &str) -> Result<()> {
    if !schema_form_core::pointer::is_json_pointer(pointer) {
        bail!("Not a JSON Pointer: {pointer:?}");
    }
    Ok(())
}

fn read_json(path: &Path, what: &str) -> Result<Value> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {what} file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {what} from: {}", path.display()))
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;

    Ok(())
}
