//! Macrogen command line
//!
//! Inspect template schemas, synthesize scripts from explicit values, query
//! the catalog, and run the conversation engine over stdin.

use anyhow::{anyhow, bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indexmap::IndexMap;
use macrogen_catalog::{filter, Catalog, Requirements};
use macrogen_core::{EngineConfig, PhaseMachine, SessionId, SessionRegistry};
use macrogen_schema::{extract, BlockSchema, ParamValue};
use macrogen_synth::{policy_by_name, Synthesizer};
use macrogen_template::TemplateSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("schema", sub)) => schema_cmd(sub).await,
        Some(("synth", sub)) => synth_cmd(sub).await,
        Some(("match", sub)) => match_cmd(sub).await,
        Some(("chat", sub)) => chat_cmd(sub).await,
        _ => unreachable!("subcommand_required"),
    }
}

fn cli() -> Command {
    Command::new("macrogen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parametric macro-script generation")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .help("Emit logs as JSON")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("schema")
                .about("Print the parameter schema of a template as JSON")
                .arg(template_arg()),
        )
        .subcommand(
            Command::new("synth")
                .about("Synthesize a script from explicit values")
                .arg(template_arg())
                .arg(
                    Arg::new("set")
                        .long("set")
                        .short('s')
                        .value_name("NAME=VALUE")
                        .help("Parameter value; repeatable")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("policy")
                        .long("policy")
                        .value_name("NAME")
                        .default_value("duplicate")
                        .help("Array expansion policy (duplicate or truncate)"),
                )
                .arg(
                    Arg::new("session")
                        .long("session")
                        .default_value("cli")
                        .help("Session id recorded in the script"),
                ),
        )
        .subcommand(
            Command::new("match")
                .about("List catalog blocks matching requirements")
                .arg(catalog_arg())
                .arg(Arg::new("dim").long("dim").help("Dimensionality (2D or 3D)"))
                .arg(Arg::new("type").long("type").help("Structure type"))
                .arg(Arg::new("material").long("material").help("Material"))
                .arg(Arg::new("application").long("application").help("Application")),
        )
        .subcommand(
            Command::new("chat")
                .about("Converse with the engine over stdin")
                .arg(catalog_arg())
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("Engine configuration (TOML)"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_name("DIR")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write generated scripts to this directory"),
                )
                .arg(
                    Arg::new("session")
                        .long("session")
                        .default_value("local")
                        .help("Session id"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print replies as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn template_arg() -> Arg {
    Arg::new("template")
        .required(true)
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Template script (.js)")
}

fn catalog_arg() -> Arg {
    Arg::new("catalog")
        .long("catalog")
        .required(true)
        .value_name("DIR")
        .value_parser(value_parser!(PathBuf))
        .help("Catalog root holding 2D/ and 3D/")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

async fn load_template(path: &Path) -> Result<TemplateSource> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let block = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("template path has no file name: {}", path.display()))?;
    Ok(TemplateSource::new(block, text))
}

async fn schema_cmd(matches: &ArgMatches) -> Result<()> {
    let path = required_path(matches, "template")?;
    let source = load_template(path).await?;
    let schema = extract(&source)?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

async fn synth_cmd(matches: &ArgMatches) -> Result<()> {
    let path = required_path(matches, "template")?;
    let source = load_template(path).await?;
    let schema = extract(&source)?;

    let assignments: Vec<&String> = matches.get_many::<String>("set").unwrap_or_default().collect();
    let values = parse_assignments(&schema, assignments.iter().map(|s| s.as_str()))?;

    let policy_name = matches
        .get_one::<String>("policy")
        .map_or("duplicate", String::as_str);
    let policy = policy_by_name(policy_name)
        .ok_or_else(|| anyhow!("unknown expansion policy: {policy_name}"))?;
    let session = matches
        .get_one::<String>("session")
        .map_or("cli", String::as_str);

    let script = Synthesizer::new(policy).synthesize(&source, &schema, &values, session)?;
    print!("{}", script.text());
    Ok(())
}

async fn match_cmd(matches: &ArgMatches) -> Result<()> {
    let catalog = Catalog::load_dir(required_path(matches, "catalog")?).await?;

    let mut requirements = Requirements::new();
    requirements.merge(Requirements {
        dimensionality: matches.get_one::<String>("dim").cloned(),
        structure_type: matches.get_one::<String>("type").cloned(),
        material: matches.get_one::<String>("material").cloned(),
        application: matches.get_one::<String>("application").cloned(),
    });

    let found = filter(catalog.candidates(), &requirements);
    if found.is_empty() {
        println!("no matching blocks");
    }
    for (i, candidate) in found.iter().enumerate() {
        println!(
            "{}. {} [{}] {} {} {}",
            i + 1,
            candidate.name,
            candidate.id,
            candidate.dimensionality,
            candidate.main_member,
            candidate.material
        );
    }
    Ok(())
}

async fn chat_cmd(matches: &ArgMatches) -> Result<()> {
    let catalog = Catalog::load_dir(required_path(matches, "catalog")?).await?;

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path).await?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = matches.get_one::<PathBuf>("output") {
        config = config.with_output_dir(dir.clone());
    }
    let json = matches.get_flag("json");
    let session = SessionId::from(
        matches
            .get_one::<String>("session")
            .map_or("local", String::as_str),
    );

    let machine = PhaseMachine::with_keywords(Arc::new(catalog), config)?;
    let registry = SessionRegistry::new(Arc::new(machine));
    info!(session = %session, "chat started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let output = match registry.handle(&session, text).await {
            Ok(reply) if json => serde_json::to_string(&reply)?,
            Ok(reply) => reply.to_string(),
            Err(e) => {
                debug!(error = %e, recoverable = e.is_recoverable(), "turn failed");
                format!("error: {e}")
            }
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn required_path<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a PathBuf> {
    matches
        .get_one::<PathBuf>(id)
        .ok_or_else(|| anyhow!("missing argument: {id}"))
}

/// Parse `NAME=VALUE` pairs against a schema
///
/// Members beyond the declared ones coerce like the group's last member.
fn parse_assignments<'a>(
    schema: &BlockSchema,
    assignments: impl IntoIterator<Item = &'a str>,
) -> Result<IndexMap<String, ParamValue>> {
    let mut values = IndexMap::new();
    for assignment in assignments {
        let (name, text) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{assignment}'"))?;
        let name = name.trim();
        let descriptor = schema
            .descriptor_for(name)
            .ok_or_else(|| anyhow!("unknown parameter: {name}"))?;
        let Some(value) = descriptor.coerce_text(text.trim()) else {
            bail!("cannot read '{}' as a {} for {name}", text.trim(), descriptor.kind.name());
        };
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrogen_test_utils as fixtures;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn assignments_coerce_by_kind() {
        let schema = extract(&fixtures::truss_source()).unwrap();
        let values = parse_assignments(&schema, ["L=15.5", "n=5", "h_5=4", "bracing=no"]).unwrap();

        assert_eq!(values["L"], ParamValue::Float(15.5));
        assert_eq!(values["n"], ParamValue::Integer(5));
        assert_eq!(values["h_5"], ParamValue::Float(4.0));
        assert_eq!(values["bracing"], ParamValue::Boolean(false));
    }

    #[test]
    fn assignments_reject_unknown_and_malformed() {
        let schema = extract(&fixtures::span_source()).unwrap();

        assert!(parse_assignments(&schema, ["width=3"]).is_err());
        assert!(parse_assignments(&schema, ["L"]).is_err());
        assert!(parse_assignments(&schema, ["L=long"]).is_err());
    }
}
