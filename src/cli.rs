/*!
tabplot Command Line Interface

Reads CSV from stdin into an in-memory table, then runs a record command or
draws a chart over it.
*/

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal, Read};
use tabplot::chart::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use tabplot::reader::DuckDBReader;
use tabplot::{
    command, create_heatmap, create_multi_comparison, create_table_from_csv, ChartOutcome,
    ComparisonOptions, DisplayMode, HeaderMode, HeatmapOptions, LoadOptions, LoadedTable,
    TabplotError, VERSION,
};

#[derive(Parser)]
#[command(name = "tabplot")]
#[command(about = "Run SQL and draw terminal charts over CSV piped on stdin")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Name of the table the input is loaded into
    #[arg(short, long, global = true, default_value = "data")]
    pub table_name: String,

    /// Field delimiter (detected from the input when omitted)
    #[arg(short, long, global = true)]
    pub delimiter: Option<char>,

    /// Treat the first row as a header
    #[arg(long, global = true, conflicts_with = "no_header")]
    pub header: bool,

    /// Treat the first row as data
    #[arg(long, global = true)]
    pub no_header: bool,

    /// Print diagnostics (generated SQL, detected format) to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Comparison cell format: full, compact, value, diff, percent, value-diff, value-percent
    #[arg(short = 'm', long, global = true, default_value = "value-percent")]
    pub display_mode: String,

    /// Version used as the comparison baseline
    #[arg(short, long, global = true)]
    pub baseline: Option<String>,

    /// Number of heatmap bins along a numeric x axis
    #[arg(long, global = true, default_value_t = DEFAULT_WIDTH)]
    pub width: usize,

    /// Number of heatmap bins along a numeric y axis
    #[arg(long, global = true, default_value_t = DEFAULT_HEIGHT)]
    pub height: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a SQL query and print the result as CSV
    #[command(visible_alias = "q")]
    Query {
        /// The SQL query to execute
        sql: String,
    },

    /// Append computed columns, e.g. "price * qty AS total"
    #[command(visible_alias = "a")]
    Add {
        /// Comma separated SQL expressions
        expressions: String,
    },

    /// Keep the rows matching a SQL predicate
    #[command(visible_alias = "f")]
    Filter {
        /// WHERE clause without the keyword
        predicate: String,
    },

    /// Group rows and aggregate the rest
    #[command(visible_alias = "g")]
    Groupby {
        /// Comma separated group fields
        fields: String,

        /// Aggregate expressions, or one of avg, sum, min, max, count
        aggregations: Option<String>,
    },

    /// Draw a text heatmap of a value over two fields
    #[command(visible_alias = "hm")]
    Heatmap {
        x_field: String,
        y_field: String,

        /// Aggregated value such as "avg(latency)" (row count when omitted)
        value_field: Option<String>,
    },

    /// Compare metrics across versions against a baseline
    #[command(visible_alias = "mcmp", alias = "cmp", alias = "comparison")]
    MultiComparison {
        versions_field: String,
        metrics_field: String,

        /// Aggregated value such as "avg(value)" (row count when omitted)
        value_field: Option<String>,
    },
}

impl Cli {
    fn header_mode(&self) -> HeaderMode {
        if self.header {
            HeaderMode::Yes
        } else if self.no_header {
            HeaderMode::No
        } else {
            HeaderMode::Auto
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let input = read_stdin()?;
    let reader = DuckDBReader::in_memory()?;
    let options = LoadOptions {
        table_name: cli.table_name.clone(),
        header_mode: cli.header_mode(),
        delimiter: cli.delimiter,
    };
    let table = create_table_from_csv(&reader, &input, &options)?;

    match &cli.command {
        Commands::Query { sql } => print!("{}", command::run_query(&reader, sql)?),
        Commands::Add { expressions } => {
            print!("{}", command::add_columns(&reader, &table, expressions)?)
        }
        Commands::Filter { predicate } => {
            print!("{}", command::filter_rows(&reader, &table, predicate)?)
        }
        Commands::Groupby {
            fields,
            aggregations,
        } => print!(
            "{}",
            command::group_by(&reader, &table, fields, aggregations.as_deref())?
        ),
        Commands::Heatmap {
            x_field,
            y_field,
            value_field,
        } => cmd_heatmap(&cli, &reader, &table, x_field, y_field, value_field.as_deref()),
        Commands::MultiComparison {
            versions_field,
            metrics_field,
            value_field,
        } => cmd_comparison(
            &cli,
            &reader,
            &table,
            versions_field,
            metrics_field,
            value_field.as_deref(),
        ),
    }

    Ok(())
}

fn read_stdin() -> anyhow::Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Err(TabplotError::InputError(
            "No input data. Please pipe CSV data to this command.".to_string(),
        )
        .into());
    }

    let mut input = String::new();
    stdin
        .read_to_string(&mut input)
        .context("Failed to read standard input")?;
    if input.trim().is_empty() {
        return Err(TabplotError::InputError("No input data received.".to_string()).into());
    }
    Ok(input)
}

fn cmd_heatmap(
    cli: &Cli,
    reader: &DuckDBReader,
    table: &LoadedTable,
    x_field: &str,
    y_field: &str,
    value_field: Option<&str>,
) {
    let options = HeatmapOptions {
        width: cli.width,
        height: cli.height,
    };
    let outcome = create_heatmap(reader, &table.name, x_field, y_field, value_field, &options);
    print_chart(outcome, "No data to plot.");
}

fn cmd_comparison(
    cli: &Cli,
    reader: &DuckDBReader,
    table: &LoadedTable,
    versions_field: &str,
    metrics_field: &str,
    value_field: Option<&str>,
) {
    let options = ComparisonOptions {
        display_mode: DisplayMode::parse_lenient(&cli.display_mode),
        baseline: cli.baseline.clone(),
    };
    let outcome = create_multi_comparison(
        reader,
        &table.name,
        versions_field,
        metrics_field,
        value_field,
        &options,
    );
    print_chart(outcome, "No data to compare.");
}

fn print_chart(outcome: ChartOutcome, empty_message: &str) {
    match outcome {
        ChartOutcome::Rendered(text) | ChartOutcome::Notice(text) => println!("{}", text),
        ChartOutcome::Empty | ChartOutcome::Failed(_) => eprintln!("{}", empty_message),
    }
}
