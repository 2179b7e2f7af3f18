use std::{fmt, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use owl::{Environment, RequestDescriptor};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "List the requests in a request file")]
pub struct List {
    /// The request file to read
    file: PathBuf,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl List {
    #[instrument(level = "debug", skip(self, environment))]
    pub fn run(self, environment: &Environment) -> anyhow::Result<()> {
        let requests = super::load_requests(&self.file, environment)?;

        match self.output {
            OutputFormat::Table => render_table(&requests),
            OutputFormat::Json => println!("{}", render_json(&requests)?),
        }

        Ok(())
    }
}

fn render_table(requests: &[RequestDescriptor]) {
    if requests.is_empty() {
        println!("{}", "No requests found".dim());
        return;
    }

    let width = requests
        .iter()
        .map(|request| request.key.chars().count())
        .max()
        .unwrap_or_default();

    for request in requests {
        let method = format!("{:<7}", request.method.as_str());
        println!(
            "{:<width$}  {} {}",
            request.key,
            method.info(),
            request.uri
        );
    }
}

fn render_json(requests: &[RequestDescriptor]) -> anyhow::Result<String> {
    use serde_json::json;

    let rows: Vec<_> = requests
        .iter()
        .map(|request| {
            json!({
                "key": request.key,
                "method": request.method,
                "uri": request.uri,
                "protocol_version": request.protocol_version,
            })
        })
        .collect();

    serde_json::to_string_pretty(&rows).context("failed to render json output")
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
        })
    }
}
