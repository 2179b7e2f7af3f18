use std::path::PathBuf;

use clap::Parser;
use owl::{
    parser::{self, RawBlock},
    Environment, RequestFile,
};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Check every request in a request file")]
pub struct Check {
    /// The request file to read
    file: PathBuf,

    /// Also run the strict lexer over each request
    ///
    /// The lexer rejects stray whitespace on the request line and header
    /// lines without a ':', among other things.
    #[arg(long)]
    strict: bool,
}

impl Check {
    #[instrument(level = "debug", skip(self, environment))]
    pub fn run(self, environment: &Environment) -> anyhow::Result<()> {
        let file = RequestFile::load(&self.file)?;
        let blocks = parser::segment(file.lines(), environment);

        let failures: Vec<Option<parser::Error>> = blocks
            .par_iter()
            .map(|block| self.check_block(block).err())
            .collect();

        for (block, failure) in blocks.iter().zip(&failures) {
            match failure {
                None => println!("{} {}", "✓".success(), block.key),
                Some(error) => {
                    println!("{} {}", "✗".error(), block.key);
                    println!("    {}", error.to_string().dim());
                }
            }
        }

        let failed = failures.iter().flatten().count();
        if failed > 0 {
            anyhow::bail!("{failed} of {} requests are invalid", blocks.len());
        }

        println!(
            "\n{}",
            format!("All {} requests are valid", blocks.len()).success()
        );
        Ok(())
    }

    fn check_block(&self, block: &RawBlock) -> Result<(), parser::Error> {
        parser::parse_block(block)?;
        if self.strict {
            parser::validate_block(block)?;
        }
        Ok(())
    }
}
