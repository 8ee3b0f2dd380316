use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use emotion_classifier::config::PipelineConfig;
use emotion_classifier::data::filter::RowSelection;
use emotion_classifier::data::loader::{self, ColumnRange};
use emotion_classifier::normalizer::BoundarySource;
use emotion_classifier::pipeline::Classifier;
use emotion_classifier::report::{self, Report};

/// Classify facial-measurement rows into emotions.
#[derive(Debug, Parser)]
#[command(name = "emotion-classifier", version, about)]
struct Cli {
    /// Input file (.csv, .json or .parquet).
    #[arg(default_value = "a.csv")]
    file: PathBuf,

    /// JSON config file; flags below override its values.
    #[arg(long, env = "EMOTION_CLASSIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// CSV field delimiter.
    #[arg(long)]
    delimiter: Option<char>,

    /// 1-based feature columns, e.g. `2..4`.
    #[arg(long)]
    features: Option<ColumnRange>,

    /// 1-based label column.
    #[arg(long)]
    label_column: Option<usize>,

    /// The CSV file has no header line.
    #[arg(long)]
    no_header: bool,

    /// Rows used to fit category boundaries.
    #[arg(long, value_enum)]
    boundaries: Option<BoundarySource>,

    /// Rows to classify.
    #[arg(long, value_enum)]
    rows: Option<RowSelection>,

    /// Print a JSON report instead of console tables.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(d) = self.delimiter {
            config.ingest.delimiter = d;
        }
        if let Some(range) = self.features {
            config.ingest.feature_columns = range;
        }
        if let Some(column) = self.label_column {
            config.ingest.label_column = Some(column);
        }
        if self.no_header {
            config.ingest.has_header = false;
        }
        if let Some(source) = self.boundaries {
            config.boundaries = source;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.pipeline_config()?;
    log::debug!("{config:?}");

    let dataset = loader::load_file(&cli.file, &config.ingest)?;
    let classifier = Classifier::fit(dataset, config.boundaries).context("fitting classifier")?;
    let results = classifier.classify(config.rows);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.json {
        let json = Report::new(&classifier, &results)
            .to_json()
            .context("serializing report")?;
        writeln!(out, "{json}")?;
        return Ok(());
    }

    writeln!(out, "Successfully loaded {} raw data vectors.\n", classifier.dataset().len())?;
    report::write_labels(&mut out, &classifier)?;
    writeln!(out)?;
    report::write_normalizers(&mut out, &classifier)?;
    writeln!(out)?;
    writeln!(out, "Classification table:")?;
    report::write_table(&mut out, &classifier)?;
    writeln!(out)?;

    let mut failed = 0;
    for (row, result) in &results {
        match result {
            Ok(outcome) => report::write_outcome(&mut out, &classifier, outcome)?,
            Err(e) => {
                failed += 1;
                report::write_row_error(&mut out, *row, e)?;
            }
        }
        writeln!(out)?;
    }

    log::info!(
        "Classified {} of {} rows",
        results.len() - failed,
        results.len()
    );
    Ok(())
}
