use std::path::{Path, PathBuf};

mod check;
mod list;
mod show;
mod terminal;

use anyhow::Context;
use check::Check;
use clap::ArgAction;
use list::List;
use owl::{
    domain::{DEFAULT_CONFIG_FILE, DEFAULT_ENVIRONMENT},
    Config, Environment, RequestDescriptor, RequestFile,
};
use show::Show;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// The environment whose variables are substituted into requests
    #[arg(short, long, default_value = DEFAULT_ENVIRONMENT, global = true)]
    env: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.execute()
    }

    fn execute(self) -> anyhow::Result<()> {
        let config = Config::load_or_default(&self.config)?;
        let environment = config.environment(&self.env)?;
        tracing::debug!(
            "Using environment '{}' with {} variables",
            self.env,
            environment.len()
        );

        self.command.run(environment)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// List the requests in a request file
    List(List),

    /// Show a single request, fully resolved
    Show(Show),

    /// Check that every request in a request file parses
    ///
    /// Each request is checked on its own, so all problems are reported at
    /// once.
    Check(Check),
}

impl Command {
    fn run(self, environment: &Environment) -> anyhow::Result<()> {
        match self {
            Self::List(command) => command.run(environment)?,
            Self::Show(command) => command.run(environment)?,
            Self::Check(command) => command.run(environment)?,
        }
        Ok(())
    }
}

/// Loads and parses every request in a request file.
#[instrument(level = "debug", skip(environment))]
fn load_requests(
    path: &Path,
    environment: &Environment,
) -> anyhow::Result<Vec<RequestDescriptor>> {
    let file = RequestFile::load(path)?;
    let requests = owl::parse_document(file.lines(), environment)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::info!("Parsed {} requests from {}", requests.len(), path.display());
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use owl::{domain::ConfigError, LoadError};
    use tempfile::tempdir;

    use super::*;

    const REQUESTS: &str = "### Health
GET {{host}}/health

### Create user
POST {{host}}/user
Content-Type: application/json

{\"name\": \"owl\"}
";

    fn write_requests(dir: &Path) -> PathBuf {
        let path = dir.join("api.http");
        fs::write(&path, REQUESTS).unwrap();
        path
    }

    #[test]
    fn load_requests_substitutes_environment() {
        let tmp = tempdir().unwrap();
        let path = write_requests(tmp.path());
        let environment = Environment::from([("host", "http://localhost:3000")]);

        let requests = load_requests(&path, &environment).expect("requests should parse");

        let keys: Vec<_> = requests.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["Health", "Create user"]);
        assert_eq!(requests[1].uri, "http://localhost:3000/user");
        assert_eq!(requests[1].body, r#"{"name": "owl"}"#);
    }

    #[test]
    fn load_requests_reports_missing_file() {
        let tmp = tempdir().unwrap();

        let error = load_requests(&tmp.path().join("missing.http"), &Environment::new())
            .expect_err("missing file should fail");

        assert!(matches!(
            error.downcast_ref::<LoadError>(),
            Some(LoadError::NotFound(_))
        ));
    }

    #[test]
    fn load_requests_names_the_file_on_parse_errors() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("broken.http");
        fs::write(&path, "### Broken\nGET http://localhost\nNoColon\n").unwrap();

        let error = load_requests(&path, &Environment::new()).expect_err("parse should fail");

        assert!(error.to_string().contains("broken.http"));
        assert!(matches!(
            error.downcast_ref::<owl::Error>(),
            Some(owl::Error::MalformedHeaderLine { line: 2, .. })
        ));
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = write_requests(tmp.path());
        let config = tmp.path().join("owl.json");
        fs::write(&config, r#"{"environments": {"local": {"host": "http://localhost"}}}"#)
            .unwrap();

        let cli = Cli::try_parse_from([
            "owl",
            "--config",
            config.to_str().unwrap(),
            "--env",
            "production",
            "list",
            path.to_str().unwrap(),
        ])
        .expect("arguments should parse");

        let error = cli.execute().expect_err("unknown environment should fail");
        assert!(matches!(
            error.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownEnvironment(name)) if name == "production"
        ));
    }

    #[test]
    fn named_environment_is_used() {
        let tmp = tempdir().unwrap();
        let path = write_requests(tmp.path());
        let config = tmp.path().join("owl.json");
        fs::write(&config, r#"{"environments": {"local": {"host": "http://localhost"}}}"#)
            .unwrap();

        let cli = Cli::try_parse_from([
            "owl",
            "-c",
            config.to_str().unwrap(),
            "-e",
            "local",
            "check",
            path.to_str().unwrap(),
        ])
        .expect("arguments should parse");

        cli.execute().expect("check should succeed");
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let tmp = tempdir().unwrap();
        let path = write_requests(tmp.path());
        let config = tmp.path().join("missing.json");

        let cli = Cli::try_parse_from([
            "owl",
            "--config",
            config.to_str().unwrap(),
            "list",
            path.to_str().unwrap(),
        ])
        .expect("arguments should parse");

        let error = cli.execute().expect_err("missing config should fail");
        assert!(matches!(
            error.downcast_ref::<ConfigError>(),
            Some(ConfigError::Read { .. })
        ));
    }
}
