use igraph_cli::{build_cli, init_logging, run, CliCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("log-json"));

    let command = CliCommand::from_matches(&matches)?;
    let config_path = matches.get_one::<std::path::PathBuf>("config").map(|p| p.as_path());

    run(command, config_path, &mut std::io::stdout().lock()).await
}
