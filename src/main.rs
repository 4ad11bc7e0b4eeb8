use clap::{Parser, Subcommand};
use quire::config::{self, Configuration};
use quire::model::{ContentModel, DEFAULT_ORDER_BY, OrderDirection};
use quire::site::Site;
use quire::{output, platform};
use serde_yaml::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`warn` when unset).
const LOG_ENV_VAR: &str = "QUIRE_LOG";

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Edit front-matter content from the command line")]
#[command(long_about = "\
Edit front-matter content from the command line

Every markdown or HTML file that opens with a YAML block is a document. Files
in `_<label>` directories belong to the `<label>` collection; the rest are
pages.

Site structure:

  site/
  ├── quire.config.yml             # Site config (optional)
  └── src/
      ├── about.md                 # Page
      ├── _posts/                  # The `posts` collection
      │   └── 2024-01-05-hello.md  # Dated post
      └── _authors/                # A configured collection
          └── jane.yml             # Pure-data document

Documents are addressed by id (printed by `list`) or by their path relative
to the source directory, e.g. `_posts/2024-01-05-hello.md`.

Values given as KEY=VALUE are parsed as YAML: `draft=true` is a boolean,
`tags=[a, b]` a list, `title=Hello` a string.

Run 'quire config --stock' to print the documented default configuration.
Set QUIRE_LOG=debug for diagnostics.")]
#[command(version)]
struct Cli {
    /// Site root directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file, relative to the root (repeatable; later files win)
    #[arg(long = "config", global = true)]
    config_files: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the merged configuration as YAML
    Config {
        /// Print the documented stock configuration instead
        #[arg(long)]
        stock: bool,
    },
    /// List the saved documents of a collection
    List {
        /// Collection label (`pages`, `posts`, or a configured collection)
        label: String,
        /// Attribute to sort by, or `use_configured` for reading order
        #[arg(long, default_value = DEFAULT_ORDER_BY)]
        order_by: String,
        /// Sort ascending (default: descending)
        #[arg(long)]
        asc: bool,
    },
    /// Show one document
    Show {
        label: String,
        /// Document id or relative path
        id: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Create and save a new document
    New {
        label: String,
        /// Attributes as KEY=VALUE
        attributes: Vec<String>,
        /// Document body
        #[arg(long)]
        content: Option<String>,
    },
    /// Change attributes of a document and save it
    Set {
        label: String,
        id: String,
        /// Attributes as KEY=VALUE
        #[arg(required = true)]
        attributes: Vec<String>,
    },
    /// Delete a document's file
    Destroy { label: String, id: String },
    /// Print the detected platform
    Platform,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Config { stock: true } => {
            print!("{}", config::stock_config_yaml());
        }
        Command::Config { stock: false } => {
            let config = load(&cli.root, &cli.config_files)?;
            print!("{}", config.to_yaml()?);
        }
        Command::List {
            label,
            order_by,
            asc,
        } => {
            let site = Site::read(load(&cli.root, &cli.config_files)?)?;
            let direction = if asc {
                OrderDirection::Asc
            } else {
                OrderDirection::Desc
            };
            let models = ContentModel::find_all_ordered(&label, &site, &order_by, direction)?;
            output::print_model_list(&label, &models);
        }
        Command::Show { label, id, json } => {
            let site = Site::read(load(&cli.root, &cli.config_files)?)?;
            let model = find(&label, &id, &site)?;
            if json {
                println!("{}", output::model_json(&model)?);
            } else {
                output::print_model(&model);
            }
        }
        Command::New {
            label,
            attributes,
            content,
        } => {
            let site = Site::read(load(&cli.root, &cli.config_files)?)?;
            let mut model = ContentModel::new_via_label(&label, &site)?;
            for pair in &attributes {
                let (key, value) = parse_assignment(pair)?;
                model.set(key, value)?;
            }
            if let Some(content) = content {
                model.set("content", ensure_trailing_newline(content))?;
            }
            let saved = model.save()?;
            output::print_lines(&output::format_saved(&model, saved));
        }
        Command::Set {
            label,
            id,
            attributes,
        } => {
            let site = Site::read(load(&cli.root, &cli.config_files)?)?;
            let mut model = find(&label, &id, &site)?;
            for pair in &attributes {
                let (key, value) = parse_assignment(pair)?;
                model.set(key, value)?;
            }
            let saved = model.save()?;
            output::print_lines(&output::format_saved(&model, saved));
        }
        Command::Destroy { label, id } => {
            let site = Site::read(load(&cli.root, &cli.config_files)?)?;
            let mut model = find(&label, &id, &site)?;
            let source = model.relative_path().unwrap_or_default();
            let destroyed = model.destroy()?;
            output::print_lines(&output::format_destroyed(&source, destroyed));
        }
        Command::Platform => {
            println!("{}", platform::name());
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(
    root: &std::path::Path,
    files: &[PathBuf],
) -> Result<Configuration, config::ConfigError> {
    config::load_config(root, files)
}

fn find(label: &str, id: &str, site: &Site) -> Result<ContentModel, Box<dyn std::error::Error>> {
    ContentModel::find(id, label, site)?
        .ok_or_else(|| format!("no document `{id}` in {label}").into())
}

/// Split `KEY=VALUE` and parse the value as a YAML scalar or flow collection.
///
/// Unparsable values are kept as plain strings.
fn parse_assignment(pair: &str) -> Result<(&str, Value), String> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{pair}`"))?;
    if key.is_empty() {
        return Err(format!("missing attribute name in `{pair}`"));
    }
    let value = serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.into()));
    Ok((key, value))
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
