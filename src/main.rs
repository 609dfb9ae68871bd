use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::info;

use callscore::config::Config;
use callscore::exposure::ExposureMethod;
use callscore::sector::{DEFAULT_NAME_COLUMN, DEFAULT_SECTOR_COLUMN};

/// callscore: lexicon scoring and metadata tooling for earnings-call transcripts.
///
/// Each subcommand is one offline step: read flat files, transform, write a
/// new flat file for the next step.
#[derive(Parser)]
#[command(name = "callscore", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Total lexicon hits divided by lexicon size
    Equal,
    /// TF-IDF weighted term frequency
    Tfidf,
}

impl From<MethodArg> for ExposureMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Equal => ExposureMethod::Equal,
            MethodArg::Tfidf => ExposureMethod::Tfidf,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fill missing sector classifications from same-name rows and name keywords
    Classify {
        /// Input sheet (.xlsx or .csv)
        input: PathBuf,
        /// Output sheet (.xlsx or .csv)
        output: PathBuf,

        /// JSON file of [keyword, sector] pairs replacing the built-in table
        #[arg(long)]
        keywords: Option<PathBuf>,

        /// Column holding company names
        #[arg(long, default_value = DEFAULT_NAME_COLUMN)]
        name_column: String,

        /// Column holding sector classifications
        #[arg(long, default_value = DEFAULT_SECTOR_COLUMN)]
        sector_column: String,
    },

    /// Score transcripts against a word list and add the exposures as a sheet column
    Exposure {
        /// Weighting scheme
        #[arg(long, value_enum, default_value = "equal")]
        method: MethodArg,

        /// Directory of .txt transcripts (joined to sheet rows in name order)
        #[arg(long)]
        transcripts: PathBuf,

        /// Word list, one term per line
        #[arg(long)]
        lexicon: PathBuf,

        /// Input sheet with one row per transcript
        #[arg(long)]
        input: PathBuf,

        /// Output sheet
        #[arg(long)]
        output: PathBuf,

        /// Output column (default: ph_expo_ew for equal, cc_expo_tfidf for tfidf)
        #[arg(long)]
        column: Option<String>,

        /// Checkpoint file (default: CALLSCORE_CHECKPOINT or ./checkpoint.json)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Transcripts per checkpointed batch (default: 100 equal, 20 tfidf)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Transcripts scored in parallel
        #[arg(long)]
        concurrency: Option<usize>,

        /// Discard any existing checkpoint and start from the first batch
        #[arg(long)]
        fresh: bool,
    },

    /// Split the finance master dictionary into positive/negative/uncertainty lists
    SplitLexicon {
        /// Master dictionary CSV (Word, Positive, Negative, Uncertainty, ...)
        master: PathBuf,

        /// Directory for the category lists
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Count positive, negative and uncertainty words in every transcript
    Sentiment {
        /// Directory of .txt transcripts
        #[arg(long)]
        transcripts: PathBuf,

        #[arg(long, default_value = "positive_words.csv")]
        positive: PathBuf,

        #[arg(long, default_value = "negative_words.csv")]
        negative: PathBuf,

        #[arg(long, default_value = "uncertainty_words.csv")]
        uncertainty: PathBuf,

        /// Output sheet
        #[arg(long, default_value = "sentiment_analysis_results.xlsx")]
        output: PathBuf,

        /// Warn if the transcript count differs from this
        #[arg(long)]
        expected: Option<usize>,

        /// Transcripts scored in parallel
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Normalize company names into a `formatted_name` join key
    NormalizeNames {
        input: PathBuf,
        output: PathBuf,

        /// Column holding company names
        #[arg(long, default_value = DEFAULT_NAME_COLUMN)]
        column: String,
    },

    /// Extract company id, name and call period from JSON transcripts
    ExtractInfo {
        /// Directory of JSON transcript files
        dir: PathBuf,

        /// Output sheet
        #[arg(long, default_value = "final_output.csv")]
        output: PathBuf,

        /// Rows to print
        #[arg(long, default_value = "10")]
        preview: usize,
    },

    /// Read a Stata .dta dataset, show its columns, and optionally convert it
    ConvertDta {
        input: PathBuf,

        /// Output sheet (.xlsx or .csv); omit to only inspect
        output: Option<PathBuf>,

        /// Rows to print
        #[arg(long, default_value = "5")]
        preview: usize,
    },

    /// Print the contents of a pickle file, optionally saving it as a word list
    InspectPickle {
        input: PathBuf,

        /// Write the flattened terms here, one per line
        #[arg(long)]
        lexicon_out: Option<PathBuf>,
    },

    /// Show the state of an exposure checkpoint
    Status {
        /// Checkpoint file (default: CALLSCORE_CHECKPOINT or ./checkpoint.json)
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("callscore=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Classify {
            input,
            output,
            keywords,
            name_column,
            sector_column,
        } => {
            let classifier = match keywords.or(config.sector_keywords) {
                Some(path) => callscore::sector::SectorClassifier::load(&path)?,
                None => callscore::sector::SectorClassifier::default(),
            };

            println!("Classifying sectors in {}...", input.display());
            let report = callscore::sector::classify_file(
                &input,
                &output,
                &classifier,
                &name_column,
                &sector_column,
            )?;

            callscore::output::terminal::display_classification_report(&report);
            println!("\n{}", format!("Updated file saved to {}", output.display()).bold());
        }

        Commands::Exposure {
            method,
            transcripts,
            lexicon,
            input,
            output,
            column,
            checkpoint,
            batch_size,
            concurrency,
            fresh,
        } => {
            let method = ExposureMethod::from(method);
            let lexicon = callscore::lexicon::Lexicon::load(&lexicon)?;
            println!("Loaded {} terms.", lexicon.len());

            let job = callscore::pipeline::exposure::ExposureJob {
                method,
                transcript_dir: transcripts,
                input_sheet: input,
                output_sheet: output,
                column: column.unwrap_or_else(|| method.default_column().to_string()),
                checkpoint: checkpoint.unwrap_or_else(|| config.checkpoint_path.clone()),
                batch_size: config.batch_size_for(batch_size, method),
                concurrency: config.concurrency_for(concurrency),
                fresh,
            };

            println!(
                "Scoring {} exposure ({} per batch, {} concurrent)...",
                method, job.batch_size, job.concurrency
            );
            let started = std::time::Instant::now();
            let outcome = callscore::pipeline::exposure::run(&job, &lexicon).await?;

            callscore::output::terminal::display_exposure_summary(&outcome, &job.column);
            info!(elapsed_secs = started.elapsed().as_secs_f64(), "Exposure run finished");
            println!(
                "\n{}",
                format!("Data saved to {}", job.output_sheet.display()).bold()
            );
        }

        Commands::SplitLexicon { master, out_dir } => {
            let written = callscore::lexicon::loughran::split_loughran_mcdonald(&master, &out_dir)?;
            println!("{}", "Files have been created:".bold());
            for path in written {
                println!("  {}", path.display());
            }
        }

        Commands::Sentiment {
            transcripts,
            positive,
            negative,
            uncertainty,
            output,
            expected,
            concurrency,
        } => {
            let lexicon =
                callscore::sentiment::SentimentLexicon::load(&positive, &negative, &uncertainty)?;
            println!(
                "Loaded {} positive, {} negative, {} uncertainty words.",
                lexicon.positive.len(),
                lexicon.negative.len(),
                lexicon.uncertainty.len()
            );

            let rows = callscore::pipeline::sentiment::run(
                &transcripts,
                lexicon,
                &output,
                expected,
                config.concurrency_for(concurrency),
            )
            .await?;

            callscore::output::terminal::display_sentiment_summary(&rows);
            println!("\n{}", format!("Results saved to {}", output.display()).bold());
        }

        Commands::NormalizeNames {
            input,
            output,
            column,
        } => {
            let rows = callscore::names::normalize_file(&input, &output, &column)?;
            println!("Formatted {rows} company names.");
            println!("{}", format!("Saved to {}", output.display()).bold());
        }

        Commands::ExtractInfo {
            dir,
            output,
            preview,
        } => {
            let infos = callscore::metadata::extract_directory(&dir)?;
            callscore::sheet::write_table(&callscore::metadata::to_table(&infos), &output)?;

            callscore::output::terminal::display_metadata(&infos, preview);
            println!("\n{}", format!("Saved to {}", output.display()).bold());
        }

        Commands::ConvertDta {
            input,
            output,
            preview,
        } => {
            let (table, meta) = callscore::formats::dta::read_dta(&input)?;

            callscore::output::terminal::display_table_preview(&table, preview);
            callscore::output::terminal::display_dta_meta(&meta);

            if let Some(output) = output {
                callscore::sheet::write_table(&table, &output)?;
                println!("\n{}", format!("Data saved to {}", output.display()).bold());
            }
        }

        Commands::InspectPickle { input, lexicon_out } => {
            let value = callscore::formats::pickle::read_pickle(&input)?;
            println!("{}", serde_json::to_string_pretty(&value)?);

            if let Some(path) = lexicon_out {
                let terms = callscore::formats::pickle::terms(&value);
                let lexicon = callscore::lexicon::Lexicon::from_terms(&terms);
                if lexicon.is_empty() {
                    anyhow::bail!("{} contains no text terms to save", input.display());
                }
                lexicon.save(&path)?;
                println!(
                    "\n{}",
                    format!("{} terms saved to {}", lexicon.len(), path.display()).bold()
                );
            }
        }

        Commands::Status { checkpoint } => {
            let path = checkpoint.unwrap_or_else(|| config.checkpoint_path.clone());
            callscore::status::show(&path)?;
        }
    }

    Ok(())
}
