//! CLI runner - executes commands

use crate::cli::commands::{parallelism_flag, Cli, Commands, OutputFormat};
use crate::config::ConvertConfig;
use crate::convert::{convert_changesets_file, convert_entities_file, ConvertSummary};
use crate::error::{Error, Result};
use crate::schema::{ChangesetSchema, EntitySchema};
use arrow::datatypes::SchemaRef;
use serde_json::{json, Value};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Entities {
                input,
                output,
                input_format,
                history,
                workers,
                parallel,
                options,
            } => {
                let mut config = self.load_config()?;
                config.history |= *history;
                if input_format.is_some() {
                    config.input_format = *input_format;
                }
                if let Some(parallelism) = parallelism_flag(*workers, *parallel) {
                    config.parallelism = parallelism;
                }
                options.apply(&mut config);
                config.validate()?;

                let (input, output) = (input.clone(), output.clone());
                let summary = run_blocking(move || {
                    convert_entities_file(&input, &output, &config)
                })
                .await?;
                self.output_summary("entities", &summary)
            }
            Commands::Changesets {
                input,
                output,
                options,
            } => {
                let mut config = self.load_config()?;
                options.apply(&mut config);
                config.validate()?;

                let (input, output) = (input.clone(), output.clone());
                let summary = run_blocking(move || {
                    convert_changesets_file(&input, &output, &config)
                })
                .await?;
                self.output_summary("changesets", &summary)
            }
            Commands::Schema {
                history,
                changesets,
            } => {
                let (name, schema) = if *changesets {
                    ("changesets", ChangesetSchema::new().arrow_schema())
                } else {
                    let schema = EntitySchema::new(*history);
                    let name = if *history { "history" } else { "entities" };
                    (name, schema.arrow_schema())
                };
                self.schema(name, &schema);
                Ok(())
            }
        }
    }

    /// Load the YAML config, or defaults when none was given
    fn load_config(&self) -> Result<ConvertConfig> {
        match &self.cli.config {
            Some(path) => ConvertConfig::load(path),
            None => Ok(ConvertConfig::default()),
        }
    }

    fn output_summary(&self, kind: &str, summary: &ConvertSummary) -> Result<()> {
        let mut summary_json = serde_json::to_value(summary)?;
        if let Value::Object(map) = &mut summary_json {
            map.insert(
                "elapsed_ms".to_string(),
                json!(summary.elapsed.as_millis() as u64),
            );
            map.remove("elapsed");
        }
        self.output_message(&json!({
            "type": "SUMMARY",
            "kind": kind,
            "summary": summary_json,
        }));
        Ok(())
    }

    /// Show the column layout of an output schema
    fn schema(&self, name: &str, schema: &SchemaRef) {
        let fields: Vec<Value> = schema
            .fields()
            .iter()
            .map(|field| {
                json!({
                    "name": field.name(),
                    "type": field.data_type().to_string(),
                    "nullable": field.is_nullable(),
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "SCHEMA",
            "schema": {
                "name": name,
                "fields": fields,
            }
        }));
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Run a blocking conversion off the async runtime
async fn run_blocking<F>(task: F) -> Result<ConvertSummary>
where
    F: FnOnce() -> Result<ConvertSummary> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| Error::Other(format!("Conversion task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_entities_command_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.osm");
        let output = dir.path().join("out.parquet");
        std::fs::write(
            &input,
            r#"<osm><node id="1" lat="1" lon="2"/><way id="2"><nd ref="1"/></way></osm>"#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "osm2parquet",
            "entities",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
        ]);
        Runner::new(cli).run().await.unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let output: PathBuf = dir.path().join("out.parquet");
        let cli = Cli::parse_from([
            "osm2parquet",
            "changesets",
            "/no/such/changesets.osm",
            output.to_str().unwrap(),
        ]);
        let err = Runner::new(cli).run().await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_batch_size_fails() {
        let cli = Cli::parse_from([
            "osm2parquet",
            "entities",
            "-",
            "out.parquet",
            "--batch-size",
            "0",
        ]);
        let err = Runner::new(cli).run().await.unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[tokio::test]
    async fn test_schema_command() {
        let cli = Cli::parse_from(["osm2parquet", "schema", "--history"]);
        Runner::new(cli).run().await.unwrap();
    }
}
