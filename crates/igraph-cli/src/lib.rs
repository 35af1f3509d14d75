//! `igraph` command-line host
//!
//! Plays the host role for the panel: loads configuration, binds the bridge
//! to the issue given on the command line, and prints results.

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use igraph_core::{GraphService, LinkRequest, PanelConfig};
use igraph_resolver::{Bridge, InvocationContext};
use igraph_tracker::{HttpTracker, TrackerApi};
use igraph_view::{render, Format, GraphSession, GraphView};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// A parsed subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Print subtasks and links of an issue
    Fetch { issue: String, json: bool },
    /// Fetch, lay out and render an issue's subtask graph
    Graph { issue: String, format: Format },
    /// Create a link
    Link { from: String, to: String, link_type: Option<String> },
    /// Delete a link by id
    UnlinkById { id: String },
    /// Delete the first link matching source, target and type
    UnlinkMatching { from: String, to: String, link_type: Option<String> },
    /// Dispatch a bridge operation by name
    Invoke { operation: String, issue: Option<String>, payload: Value },
}

/// Command-line definition
#[must_use]
pub fn build_cli() -> Command {
    let issue = Arg::new("issue")
        .long("issue")
        .short('i')
        .value_name("KEY")
        .help("Key of the parent issue");
    let link_type = Arg::new("type")
        .long("type")
        .value_name("TYPE")
        .help("Link type name [default: panel.link_type]");

    Command::new("igraph")
        .version(igraph_core::VERSION)
        .about("Subtask link graph for an issue tracker")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("fetch")
                .about("Print the subtasks of an issue and their outward links")
                .arg(issue.clone().required(true))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("graph")
                .about("Lay out and render the subtask graph")
                .arg(issue.clone().required(true))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .default_value("dot")
                        .value_parser(["dot", "json", "text"])
                        .help("Output format"),
                ),
        )
        .subcommand(
            Command::new("link")
                .about("Create a link from one issue to another")
                .arg(Arg::new("from").long("from").required(true).value_name("KEY").help("Inward issue"))
                .arg(Arg::new("to").long("to").required(true).value_name("KEY").help("Outward issue"))
                .arg(link_type.clone()),
        )
        .subcommand(
            Command::new("unlink")
                .about("Delete a link by id, or the first one matching its ends and type")
                .arg(
                    Arg::new("id")
                        .long("id")
                        .value_name("ID")
                        .conflicts_with_all(["from", "to", "type"])
                        .help("Tracker link id"),
                )
                .arg(Arg::new("from").long("from").value_name("KEY").requires("to").help("Inward issue"))
                .arg(Arg::new("to").long("to").value_name("KEY").requires("from").help("Outward issue"))
                .arg(link_type)
                .group(ArgGroup::new("target").args(["id", "from"]).required(true)),
        )
        .subcommand(
            Command::new("invoke")
                .about("Dispatch a bridge operation by name")
                .arg(
                    Arg::new("operation")
                        .required(true)
                        .value_name("OPERATION")
                        .help("fetchSubtasks, addLink, removeLinkById or removeMatchingLink"),
                )
                .arg(issue.help("Issue the invocation context is bound to"))
                .arg(
                    Arg::new("payload")
                        .long("payload")
                        .short('p')
                        .value_name("JSON")
                        .help("Operation payload"),
                ),
        )
}

impl CliCommand {
    /// Convert clap matches into a command
    ///
    /// # Errors
    /// Fails on an unknown subcommand or a payload that is not JSON.
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let string = |args: &ArgMatches, id: &str| args.get_one::<String>(id).cloned();
        let required = |args: &ArgMatches, id: &str| {
            string(args, id).ok_or_else(|| anyhow!("missing argument --{id}"))
        };

        match matches.subcommand() {
            Some(("fetch", args)) => Ok(Self::Fetch {
                issue: required(args, "issue")?,
                json: args.get_flag("json"),
            }),
            Some(("graph", args)) => {
                let format = required(args, "format")?
                    .parse::<Format>()
                    .map_err(|e| anyhow!(e))?;
                Ok(Self::Graph {
                    issue: required(args, "issue")?,
                    format,
                })
            }
            Some(("link", args)) => Ok(Self::Link {
                from: required(args, "from")?,
                to: required(args, "to")?,
                link_type: string(args, "type"),
            }),
            Some(("unlink", args)) => match string(args, "id") {
                Some(id) => Ok(Self::UnlinkById { id }),
                None => Ok(Self::UnlinkMatching {
                    from: required(args, "from")?,
                    to: required(args, "to")?,
                    link_type: string(args, "type"),
                }),
            },
            Some(("invoke", args)) => {
                let payload = match args.get_one::<String>("payload") {
                    Some(text) => serde_json::from_str(text).context("--payload is not valid JSON")?,
                    None => Value::Null,
                };
                Ok(Self::Invoke {
                    operation: required(args, "operation")?,
                    issue: string(args, "issue"),
                    payload,
                })
            }
            Some((other, _)) => Err(anyhow!("unknown command '{other}'")),
            None => Err(anyhow!("no command given")),
        }
    }

    /// Issue the bridge context is bound to
    fn context(&self) -> anyhow::Result<InvocationContext> {
        let key = match self {
            Self::Fetch { issue, .. } | Self::Graph { issue, .. } => issue.clone(),
            Self::Link { from, .. } | Self::UnlinkMatching { from, .. } => from.clone(),
            // removal by id does not read the context
            Self::UnlinkById { .. } => String::new(),
            Self::Invoke { issue, payload, .. } => issue
                .clone()
                .or_else(|| payload.get("inwardIssue").and_then(Value::as_str).map(str::to_string))
                .ok_or_else(|| anyhow!("invoke needs --issue to bind the invocation context"))?,
        };
        Ok(InvocationContext::new(key))
    }
}

/// Install the tracing subscriber; `RUST_LOG` filters, default `info`
pub fn init_logging(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = installed {
        eprintln!("logging already initialised: {e}");
    }
}

/// Load configuration and run a command against the configured tracker
///
/// # Errors
/// Configuration, tracker and output failures.
pub async fn run(command: CliCommand, config_path: Option<&Path>, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = PanelConfig::load(config_path).context("loading configuration")?;
    let tracker = HttpTracker::from_settings(&config.tracker).context("building tracker client")?;
    execute(command, tracker, &config, out).await
}

/// Run a command against any tracker client
///
/// # Errors
/// Bridge failures and output failures.
pub async fn execute<T>(command: CliCommand, tracker: T, config: &PanelConfig, out: &mut dyn Write) -> anyhow::Result<()>
where
    T: TrackerApi + 'static,
{
    let bridge = Bridge::new(tracker, command.context()?);
    tracing::debug!(?command, "executing");

    match command {
        CliCommand::Fetch { json, .. } => {
            let graph = bridge.fetch_subtasks().await?;
            if json {
                serde_json::to_writer_pretty(&mut *out, &graph)?;
                writeln!(out)?;
            } else {
                for issue in &graph.subtasks {
                    writeln!(out, "{}\t{}\t{}\t{}", issue.key, issue.status, issue.status_category, issue.summary)?;
                }
                for link in &graph.links {
                    writeln!(
                        out,
                        "{} -[{}]-> {}\t#{}",
                        link.inward_issue,
                        link.link_type,
                        link.outward_issue,
                        link.id.as_deref().unwrap_or("-")
                    )?;
                }
            }
        }
        CliCommand::Graph { format, .. } => {
            let mut session = GraphSession::new(Arc::new(bridge), GraphView::from_config(config));
            session.refresh().await?;
            let base_url = config.tracker.base_url.as_deref();
            let rendered = render(&session.view().snapshot(), format, base_url)?;
            out.write_all(rendered.as_bytes())?;
        }
        CliCommand::Link { from, to, link_type } => {
            let request = LinkRequest::new(from, to, link_type.unwrap_or_else(|| config.panel.link_type.clone()));
            let response = bridge.add_link(request).await?;
            if !response.is_success() {
                tracing::warn!(status = response.status, "tracker rejected the link");
            }
            print_json(out, &response)?;
        }
        CliCommand::UnlinkById { id } => {
            let response = bridge.remove_link_by_id(id).await?;
            print_json(out, &response)?;
        }
        CliCommand::UnlinkMatching { from, to, link_type } => {
            let request = LinkRequest::new(from, to, link_type.unwrap_or_else(|| config.panel.link_type.clone()));
            match bridge.remove_matching_link(request).await? {
                Some(response) => print_json(out, &response)?,
                None => writeln!(out, "no matching link")?,
            }
        }
        CliCommand::Invoke { operation, payload, .. } => {
            let value = bridge.invoke(&operation, payload).await?;
            print_json(out, &value)?;
        }
    }
    Ok(())
}

fn print_json(out: &mut dyn Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
