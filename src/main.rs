use std::process::ExitCode;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use ipq_agent::cli::Cli;
use ipq_agent::config::Conf;
use ipq_agent::transport::NetlinkChannel;
use ipq_agent::{Client, Result, StaticPolicy};

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(cli.log_level).into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(exit_code = err.exit_code(), "{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let conf = Conf::new(cli)?;
    let origin_id = conf.resolved_origin_id();
    tracing::debug!(?conf, origin_id, "Loaded configuration");

    let channel = NetlinkChannel::open(origin_id)?;
    let mut client = Client::builder()
        .copy_mode(conf.copy_mode)
        .range(conf.range)
        .origin_id(origin_id)
        .policy(StaticPolicy::new(conf.default_verdict))
        .build(channel);

    client.run()
}
