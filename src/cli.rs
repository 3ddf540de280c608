//! CLI: document schemas → SDL, field definitions → SDL, email preview/dispatch.
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::Value;

use doc_gql::convert::{InputTypeCache, to_input};
use doc_gql::email::{Delivery, Mailer};
use doc_gql::ir::TypeRegistry;
use doc_gql::walker::{SchemaCatalog, walk};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// GraphQL helpers for document-store backed APIs
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log filter (RUST_LOG wins when set)
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// walk document schemas and print the GraphQL types as SDL
    Schema(SchemaOut),
    /// synthesize output/input/update types from a field definition file
    Types(TypesOut),
    /// render an email template, and optionally send it
    Email(EmailCmd),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select the schema catalog in each document (e.g. /models)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// only walk this model (default: every model in the catalog)
    #[arg(long)]
    model: Option<String>,

    /// also derive `<Type>InputType` input objects
    #[arg(long)]
    inputs: bool,

    /// output .graphql file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct TypesOut {
    /// field definition file (JSON)
    #[arg(long, short)]
    input: PathBuf,

    /// base type name
    #[arg(long)]
    name: String,

    /// output .graphql file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct EmailCmd {
    /// settings file (JSON)
    #[arg(long)]
    config: PathBuf,

    #[arg(long)]
    template: String,

    #[arg(long)]
    to: String,

    /// template variable, `key=value`; repeatable
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// actually send (otherwise only print the rendered message)
    #[arg(long)]
    send: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_catalog(&self, path: &Path) -> anyhow::Result<SchemaCatalog> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {}", path.display()))?;
        let value = serde_json::from_str::<Value>(&source)
            .with_context(|| format!("Failed to parse JSON source file ({})", path.display()))?;
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} matched nothing in {}", path.display()))?,
        };
        Ok(SchemaCatalog::from_json(value)?)
    }
}

impl SchemaOut {
    fn registry_for(&self, path: &Path) -> anyhow::Result<TypeRegistry> {
        let catalog = self.input_settings.load_catalog(path)?;
        let models: Vec<String> = match &self.model {
            Some(model) => vec![model.clone()],
            None => catalog.names().map(str::to_string).collect(),
        };
        let mut registry = TypeRegistry::new();
        let mut cache = InputTypeCache::new();
        for model in &models {
            let walked = walk(&catalog, model).with_context(|| format!("while walking `{model}`"))?;
            let types = walked.materialize();
            if self.inputs {
                if let Some(root) = types.object(&walked.root) {
                    to_input(&types, root, None, &mut cache);
                }
            }
            registry.extend(types.into_types());
        }
        registry.extend(cache.into_types());
        Ok(registry)
    }

    fn run(&self) -> anyhow::Result<()> {
        let paths = resolve_file_path_patterns(&self.input_settings.input)?;
        let results: Vec<(PathBuf, anyhow::Result<TypeRegistry>)> =
            paths.into_par_iter().map(|path| {
                let out = self.registry_for(&path);
                (path, out)
            }).collect();

        let mut registry = TypeRegistry::new();
        let mut failed = 0usize;
        for (path, result) in results {
            match result {
                Ok(types) => {
                    eprintln!("{} {} ({} types)", "✓".green(), path.display(), types.len());
                    registry.extend(types.into_types());
                }
                Err(error) => {
                    failed += 1;
                    eprintln!("{} {}: {error:#}", "✗".red(), path.display());
                }
            }
        }
        if failed > 0 {
            bail!("{failed} input(s) failed");
        }
        write_output(self.out.as_deref(), &doc_gql::sdl::print(&registry))
    }
}

impl TypesOut {
    fn run(&self) -> anyhow::Result<()> {
        let value: Value = doc_gql::path_de::from_file_with_path(&self.input)?;
        let definitions = doc_gql::fields::definitions_from_json(value)?;
        let synthesized = doc_gql::synth::synthesize(&self.name, &definitions);
        let mut registry = TypeRegistry::new();
        registry.extend(synthesized.into_defs());
        eprintln!("{} {} ({} fields)", "✓".green(), self.name.bold(), definitions.len());
        write_output(self.out.as_deref(), &doc_gql::sdl::print(&registry))
    }
}

impl EmailCmd {
    fn run(&self) -> anyhow::Result<()> {
        let settings = doc_gql::config::Settings::from_file(&self.config)?;
        let mailer = Mailer::new(settings.email, settings.templates)?;
        let vars: IndexMap<String, String> = self.vars.iter().cloned().collect();

        let message = mailer.render(&self.to, &self.template, &vars)?;
        println!("{} {}", "To:".bold(), message.to);
        println!("{} {}", "Subject:".bold(), message.subject);
        println!("{}", message.html);

        if !self.send {
            return Ok(());
        }
        let runtime = tokio::runtime::Runtime::new()?;
        match runtime.block_on(mailer.send(&self.to, &self.template, &vars))? {
            Delivery::Disabled => eprintln!("{} emails are disabled in settings", "!".yellow()),
            Delivery::Sent { id } => eprintln!("{} sent {}", "✓".green(), id.unwrap_or_default()),
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn log_filter(&self) -> &str {
        &self.log
    }
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Schema(target) => target.run(),
            Command::Types(target) => target.run(),
            Command::Email(target) => target.run(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

fn write_output(out: Option<&Path>, src: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            print!("{src}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
