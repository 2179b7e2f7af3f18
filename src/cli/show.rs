use std::path::PathBuf;

use clap::Parser;
use owl::{Environment, RequestDescriptor};
use tracing::instrument;

use super::terminal::{is_interactive, Colorize};

#[derive(Debug, Parser)]
#[command(about = "Display a single request with variables substituted")]
pub struct Show {
    /// The request file to read
    file: PathBuf,

    /// The name of the request to display
    ///
    /// If omitted, the request is picked interactively.
    key: Option<String>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
    /// The request as it would be written in a request file
    Raw,
}

impl Show {
    #[instrument(level = "debug", skip(self, environment))]
    pub fn run(self, environment: &Environment) -> anyhow::Result<()> {
        let requests = super::load_requests(&self.file, environment)?;
        if requests.is_empty() {
            anyhow::bail!("no requests found in {}", self.file.display());
        }

        let request = match &self.key {
            Some(key) => requests
                .iter()
                .find(|request| &request.key == key)
                .ok_or_else(|| anyhow::anyhow!("request '{key}' not found"))?,
            None => pick(&requests, is_interactive())?,
        };

        match self.output {
            OutputFormat::Pretty => output_pretty(request),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(request)?),
            OutputFormat::Raw => print!("{request}"),
        }

        Ok(())
    }
}

fn pick(requests: &[RequestDescriptor], interactive: bool) -> anyhow::Result<&RequestDescriptor> {
    if !interactive {
        anyhow::bail!("a request name is required when not running interactively");
    }

    let keys: Vec<&str> = requests.iter().map(|request| request.key.as_str()).collect();
    let index = dialoguer::Select::new()
        .with_prompt("Request")
        .items(&keys)
        .default(0)
        .interact()?;

    Ok(&requests[index])
}

fn output_pretty(request: &RequestDescriptor) {
    println!("# {}", request.key);
    println!("{}", request.request_line().info());

    if !request.headers.is_empty() {
        println!("\n{}", "Headers".dim());
        for (name, value) in &request.headers {
            println!("  {name}: {value}");
        }
    }

    if !request.body.is_empty() {
        println!("\n{}", "Body".dim());
        println!("{}", request.body);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn show(file: PathBuf, key: Option<&str>, output: OutputFormat) -> Show {
        Show {
            file,
            key: key.map(ToString::to_string),
            output,
        }
    }

    #[test]
    fn shows_request_by_key() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("api.http");
        fs::write(&path, "### Health\nGET http://localhost/health\n").unwrap();

        for output in [OutputFormat::Pretty, OutputFormat::Json, OutputFormat::Raw] {
            show(path.clone(), Some("Health"), output)
                .run(&Environment::new())
                .expect("show should succeed");
        }
    }

    #[test]
    fn unknown_key_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("api.http");
        fs::write(&path, "### Health\nGET http://localhost/health\n").unwrap();

        let error = show(path, Some("Missing"), OutputFormat::Pretty)
            .run(&Environment::new())
            .expect_err("unknown key should fail");

        assert_eq!(error.to_string(), "request 'Missing' not found");
    }

    #[test]
    fn empty_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("empty.http");
        fs::write(&path, "// nothing yet\n").unwrap();

        let error = show(path, Some("Health"), OutputFormat::Pretty)
            .run(&Environment::new())
            .expect_err("empty file should fail");

        assert!(error.to_string().starts_with("no requests found"));
    }

    #[test]
    fn picking_requires_a_terminal() {
        let requests = owl::parse_str("GET http://localhost\n", &Environment::new()).unwrap();

        let error = pick(&requests, false).expect_err("picking should fail without a terminal");

        assert_eq!(
            error.to_string(),
            "a request name is required when not running interactively"
        );
    }
}
