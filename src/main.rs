use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use estate_dashboard::data::aggregate::MAX_BINS;
use estate_dashboard::data::cache::DatasetCache;
use estate_dashboard::data::export::export_csv_path;
use estate_dashboard::report::{
    dataset_options, ReportOptions, DEFAULT_BINS, DEFAULT_TOP_CITIES, DEFAULT_TOP_EXPENSIVE,
};
use estate_dashboard::{Category, FilterSpec, NumericField, NumericRange, Session};

/// Filter a real-estate listings dataset and print the dashboard report as JSON.
#[derive(Parser, Debug)]
#[command(name = "estate-dashboard", version, about)]
struct Cli {
    /// Listings dataset (.csv, .json or .parquet)
    dataset: PathBuf,

    /// JSON filter spec applied before the individual filter flags
    #[arg(long, value_name = "FILE")]
    filters: Option<PathBuf>,

    /// Allowed city (repeatable)
    #[arg(long = "city", value_name = "CITY")]
    cities: Vec<String>,

    /// Allowed property type (repeatable)
    #[arg(long = "type", value_name = "TYPE")]
    property_types: Vec<String>,

    /// Allowed listing kind, the dataset's `rent` column (repeatable)
    #[arg(long = "rent", value_name = "KIND")]
    listing_kinds: Vec<String>,

    /// Allowed furnished status (repeatable)
    #[arg(long, value_name = "STATUS")]
    furnished: Vec<String>,

    /// Inclusive price range
    #[arg(long, value_name = "MIN..MAX")]
    price: Option<NumericRange>,

    /// Inclusive area range in square meters
    #[arg(long, value_name = "MIN..MAX")]
    area: Option<NumericRange>,

    #[arg(long, value_name = "MIN..MAX")]
    bedrooms: Option<NumericRange>,

    #[arg(long, value_name = "MIN..MAX")]
    bathrooms: Option<NumericRange>,

    /// Ad id to compare side by side (repeatable)
    #[arg(long = "compare", value_name = "AD_ID")]
    compare: Vec<String>,

    /// Number of price histogram bins (1 to 1000)
    #[arg(long, default_value_t = DEFAULT_BINS)]
    bins: usize,

    #[arg(long, default_value_t = DEFAULT_TOP_CITIES)]
    top_cities: usize,

    #[arg(long, default_value_t = DEFAULT_TOP_EXPENSIVE)]
    top_expensive: usize,

    /// Write the filtered listings to this CSV file
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the selectable values and ranges of the dataset and exit
    #[arg(long)]
    list_options: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Filter dimensions given directly on the command line.
    fn flag_overrides(&self) -> FilterSpec {
        let mut spec = FilterSpec::default();
        let categories = [
            (Category::City, &self.cities),
            (Category::PropertyType, &self.property_types),
            (Category::ListingKind, &self.listing_kinds),
            (Category::Furnished, &self.furnished),
        ];
        for (category, values) in categories {
            if !values.is_empty() {
                spec.select(category, values.iter().cloned());
            }
        }
        let ranges = [
            (NumericField::Price, self.price),
            (NumericField::Area, self.area),
            (NumericField::Bedrooms, self.bedrooms),
            (NumericField::Bathrooms, self.bathrooms),
        ];
        for (field, range) in ranges {
            if let Some(range) = range {
                spec.set_range(field, range);
            }
        }
        spec
    }

    fn report_options(&self) -> ReportOptions {
        ReportOptions {
            bins: self.bins,
            top_cities: self.top_cities,
            top_expensive: self.top_expensive,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(&cli) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    if !(1..=MAX_BINS).contains(&cli.bins) {
        bail!("--bins must be between 1 and {MAX_BINS}, got {}", cli.bins);
    }

    let mut cache = DatasetCache::new();
    let table = cache
        .load(&cli.dataset)
        .with_context(|| format!("loading dataset {}", cli.dataset.display()))?;

    if cli.list_options {
        return write_json(cli.output.as_deref(), &dataset_options(&table));
    }

    let mut session = Session::new(table);
    if let Some(path) = &cli.filters {
        session.apply(read_filter_spec(path)?);
    }
    session.apply(cli.flag_overrides());
    session.set_comparison(cli.compare.iter().cloned());

    let view = session.view();
    if view.is_empty() {
        log::info!("No listings match the current filters");
    }
    if let Some(path) = &cli.export {
        export_csv_path(&view, path)
            .with_context(|| format!("exporting filtered listings to {}", path.display()))?;
    }

    let report = session.report(&cli.report_options());
    write_json(cli.output.as_deref(), &report)
}

fn read_filter_spec(path: &Path) -> Result<FilterSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading filter spec {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing filter spec {}", path.display()))
}

fn write_json<T: serde::Serialize>(output: Option<&Path>, value: &T) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating report file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value).context("writing JSON report")?;
            writer.flush().context("flushing JSON report")?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, value).context("writing JSON report")?;
            writeln!(writer).context("writing JSON report")?;
        }
    }
    Ok(())
}
