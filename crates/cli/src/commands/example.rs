// `rpcdesk example`: print the example body a new tab would start with.

use std::path::PathBuf;

use clap::Args;
use rpcdesk_common::schema::generate_example;
use serde::Serialize;

use super::read_schema;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ExampleArgs {
    /// Request message schema (reflection JSON).
    #[arg(long)]
    schema: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleResult {
    pub message: String,
    pub body: String,
}

pub fn run(args: ExampleArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = read_schema(&args.schema)
        .map(|message| ExampleResult { body: generate_example(Some(&message)), message: message.name });

    match result {
        Ok(result) => {
            output::print_output(format, &result, |r| r.body.clone())?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}
