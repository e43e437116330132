use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

/// Userspace verdict agent for the ip_queue packet queue.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Set the path to the configuration file (e.g., "agent.toml").
    #[arg(short, long, value_name = "FILE", env = "IPQ_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Set the default log level (e.g., "debug", "warn"). `RUST_LOG` takes precedence.
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        env = "IPQ_LOG_LEVEL",
        default_value = "info"
    )]
    pub log_level: Level,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser as _;
    use figment::Jail;
    use tracing::Level;

    use super::Cli;

    #[test]
    fn test_parses_long_flags() {
        Jail::expect_with(|_| {
            let cli = Cli::parse_from([
                "ipq-agent",
                "--config",
                "/etc/ipq-agent.toml",
                "--log-level",
                "warn",
            ]);
            assert_eq!(cli.config, Some(PathBuf::from("/etc/ipq-agent.toml")));
            assert_eq!(cli.log_level, Level::WARN);
            Ok(())
        });
    }

    #[test]
    fn test_parses_from_env_when_no_args() {
        Jail::expect_with(|jail| {
            jail.set_env("IPQ_CONFIG_PATH", "/tmp/agent.toml");
            jail.set_env("IPQ_LOG_LEVEL", "debug");

            let cli = Cli::parse_from(["ipq-agent"]);
            assert_eq!(cli.config, Some(PathBuf::from("/tmp/agent.toml")));
            assert_eq!(cli.log_level, Level::DEBUG);
            Ok(())
        });
    }

    #[test]
    fn test_default_log_level_is_info() {
        Jail::expect_with(|_| {
            let cli = Cli::parse_from(["ipq-agent"]);
            assert_eq!(cli.log_level, Level::INFO);
            assert_eq!(cli.config, None);
            Ok(())
        });
    }
}
