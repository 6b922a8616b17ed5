use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::data::encoding::TextEncoding;
use crate::data::tags::{RowRange, TagTable};
use crate::data::taxonomy::{
    read_column, Taxonomy, TaxonomySource, DEFAULT_TAXONOMY_FILE, NAME_SEQ_FIELD, NOT_FOUND_TEXT,
    TX_ID_FIELD,
};
use crate::error::Result;
use crate::naming::batch::{run_batch, BatchOptions};
use crate::naming::corrector::{Corrector, DEFAULT_CORRECTIONS_FILE};
use crate::naming::filename::stem_fragments;
use crate::naming::strict::{check, HeaderSets, DEFAULT_CHECK_PATTERN};

#[derive(Debug, Parser)]
#[command(name = "curator", version)]
#[command(about = "Build tag tables and taxonomies; validate and correct tagged data file names")]
pub struct Cli {
    /// YAML settings file (default: $CURATOR_CONFIG, then ./curator.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build tags.json from a fixed-layout tag-table export
    BuildTags(BuildTagsArgs),
    /// Build taxonomy.json from per-tag tables or one headed table
    BuildTaxonomy(BuildTaxonomyArgs),
    /// Correct file names against tags.json and copy files to a destination tree
    Validate(ValidateArgs),
    /// Strictly check file names against a header file, copying exact matches
    Check(CheckArgs),
    /// Dump the suffix correction map derived from tags.json
    Corrections(CorrectionsArgs),
    /// Describe the tags of a file name, or list records for a name position
    Describe(DescribeArgs),
}

#[derive(Debug, Args)]
pub struct BuildTagsArgs {
    /// Tag-table export
    #[arg(short, long)]
    pub source: PathBuf,
    /// First row to read (0-based, inclusive)
    #[arg(long)]
    pub first_row: Option<usize>,
    /// Last row to read (exclusive)
    #[arg(long)]
    pub last_row: Option<usize>,
    #[arg(long, value_parser = parse_encoding)]
    pub encoding: Option<TextEncoding>,
    /// Directory to write tags.json into
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct BuildTaxonomyArgs {
    /// Directory holding one headerless CSV per tag
    #[arg(short, long, required_unless_present = "table", conflicts_with = "table")]
    pub source: Option<PathBuf>,
    /// Single CSV with a header row
    #[arg(long)]
    pub table: Option<PathBuf>,
    /// Tag identifiers in filename order (comma separated)
    #[arg(short, long, value_delimiter = ',', requires = "source")]
    pub tags: Vec<String>,
    /// Column names of the per-tag tables (comma separated)
    #[arg(short, long, value_delimiter = ',', requires = "source")]
    pub names: Vec<String>,
    /// Column used as the record key
    #[arg(long)]
    pub pivot: Option<String>,
    /// File name prefix of the per-tag tables
    #[arg(long, default_value = "")]
    pub prefix: String,
    /// Key records by pivot value only, without the table index
    #[arg(long)]
    pub no_positional: bool,
    /// Headerless CSV listing one declared name per row (headed-table mode gap filling)
    #[arg(long, requires = "table")]
    pub positions_file: Option<PathBuf>,
    #[arg(long, default_value_t = 1)]
    pub positions_column: usize,
    #[arg(long, value_parser = parse_encoding)]
    pub encoding: Option<TextEncoding>,
    #[arg(short, long, default_value = DEFAULT_TAXONOMY_FILE)]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(short, long)]
    pub source: PathBuf,
    #[arg(short, long)]
    pub destination: PathBuf,
    /// tags.json (default: $CURATOR_TAGS_PATH, config tags_path, ./tags.json)
    #[arg(long)]
    pub tags: Option<PathBuf>,
    /// taxonomy.json used to describe resolved tags in debug logs
    #[arg(long)]
    pub taxonomy: Option<PathBuf>,
    /// Glob relative to the source directory
    #[arg(long)]
    pub pattern: Option<String>,
    /// Audit CSV name inside the destination
    #[arg(long)]
    pub audit_file: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Header file: one row per position, `<n> <key> <alias>...`
    #[arg(long)]
    pub header: PathBuf,
    #[arg(short, long)]
    pub source: PathBuf,
    /// Copy fully matching files here
    #[arg(short, long)]
    pub destination: Option<PathBuf>,
    /// Glob relative to the source directory (default: *.csv, top level only)
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Debug, Args)]
pub struct CorrectionsArgs {
    #[arg(long)]
    pub tags: Option<PathBuf>,
    #[arg(short, long, default_value = DEFAULT_CORRECTIONS_FILE)]
    pub out: PathBuf,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    #[arg(long)]
    pub taxonomy: PathBuf,
    /// File name whose fragments are looked up
    #[arg(required_unless_present = "position")]
    pub filename: Option<String>,
    /// List the records declared for this 1-based name position instead
    #[arg(long, conflicts_with = "filename")]
    pub position: Option<u64>,
    /// Record field to print
    #[arg(long, default_value = TX_ID_FIELD)]
    pub field: String,
}

fn parse_encoding(raw: &str) -> std::result::Result<TextEncoding, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 2,
            };
        }
    };
    init_logging(cli.verbose);

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("config failed: {err}");
            return 1;
        }
    };
    debug!(?settings, "resolved settings");

    match cli.command {
        Command::BuildTags(args) => report("build-tags", handle_build_tags(&settings, args)),
        Command::BuildTaxonomy(args) => handle_build_taxonomy(&settings, args),
        Command::Validate(args) => report("validate", handle_validate(&settings, args)),
        Command::Check(args) => handle_check(args),
        Command::Corrections(args) => report("corrections", handle_corrections(&settings, args)),
        Command::Describe(args) => report("describe", handle_describe(args)),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(command: &str, result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{command} failed: {err}");
            1
        }
    }
}

fn handle_build_tags(settings: &Settings, args: BuildTagsArgs) -> Result<()> {
    let range = RowRange {
        first: args.first_row.unwrap_or(settings.first_row),
        last: args.last_row.unwrap_or(settings.last_row),
    };
    let encoding = args.encoding.unwrap_or(settings.tag_encoding);
    let table = TagTable::from_source(&args.source, encoding, range)?;
    let path = table.dump(&args.out)?;
    println!(
        "Tags successfully exported! \u{2714} positions={} path='{}'",
        table.len(),
        path.display()
    );
    Ok(())
}

fn handle_build_taxonomy(settings: &Settings, args: BuildTaxonomyArgs) -> i32 {
    let pivot = args.pivot.clone().unwrap_or_else(|| settings.pivot.clone());
    let encoding = args.encoding.unwrap_or(settings.table_encoding);

    let built = match (&args.source, &args.table) {
        (Some(dir), _) => {
            if args.tags.is_empty() || args.names.is_empty() {
                eprintln!("usage: curator build-taxonomy --source <dir> --tags <a,b,..> --names <c1,c2,..>");
                return 2;
            }
            let source = TaxonomySource {
                tags: args.tags.clone(),
                names: args.names.clone(),
                pivot,
                prefix: args.prefix.clone(),
                positional: !args.no_positional,
                encoding,
            };
            Taxonomy::from_tag_tables(dir, &source).map(|taxonomy| (taxonomy, source.tags.len()))
        }
        (None, Some(table)) => build_from_headed_table(table, &pivot, encoding, &args),
        (None, None) => {
            eprintln!("usage: curator build-taxonomy (--source <dir> | --table <csv>)");
            return 2;
        }
    };

    let result = built.and_then(|(mut taxonomy, positions)| {
        let added = taxonomy.fill_gaps(positions);
        taxonomy.dump(&args.out)?;
        println!(
            "Taxonomy successfully exported! \u{2714} records={} defaults_added={} path='{}'",
            taxonomy.len(),
            added,
            args.out.display()
        );
        Ok(())
    });
    report("build-taxonomy", result)
}

fn build_from_headed_table(
    table: &std::path::Path,
    pivot: &str,
    encoding: TextEncoding,
    args: &BuildTaxonomyArgs,
) -> Result<(Taxonomy, usize)> {
    let taxonomy = Taxonomy::from_headed_table(table, pivot, encoding)?;
    let positions = match &args.positions_file {
        Some(path) => read_column(path, encoding, args.positions_column)?.len(),
        None => 0,
    };
    Ok((taxonomy, positions))
}

fn handle_validate(settings: &Settings, args: ValidateArgs) -> Result<()> {
    let tags_path = args.tags.unwrap_or_else(|| settings.tags_path.clone());
    let corrector = Corrector::new(TagTable::load(&tags_path)?);
    let taxonomy = args.taxonomy.as_ref().map(|path| Taxonomy::load(path)).transpose()?;

    let mut options = BatchOptions::new(args.source, args.destination);
    options.pattern = args.pattern.unwrap_or_else(|| settings.pattern.clone());
    options.audit_file = args.audit_file.unwrap_or_else(|| settings.audit_file.clone());

    let summary = run_batch(&corrector, &options, taxonomy.as_ref())?;
    println!(
        "All files were checked! \u{2714} processed={} unchanged={} corrected={} unresolved_tags={} audit='{}'",
        summary.processed,
        summary.unchanged,
        summary.corrected,
        summary.unresolved_tags,
        summary.audit_path.display()
    );
    Ok(())
}

fn handle_check(args: CheckArgs) -> i32 {
    let pattern = args.pattern.unwrap_or_else(|| DEFAULT_CHECK_PATTERN.to_string());
    let result = HeaderSets::load(&args.header).and_then(|header| {
        check(&header, &args.source, &pattern, args.destination.as_deref())
    });
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            eprintln!("check failed: {err}");
            return 1;
        }
    };

    for rejected in &report.rejected {
        println!("\u{2718} {:?}", rejected.fragments);
        println!("{:?}", rejected.matches);
    }
    println!(
        "checked={} accepted={} rejected={}",
        report.checked,
        report.accepted.len(),
        report.rejected.len()
    );
    if report.is_clean() {
        0
    } else {
        1
    }
}

fn handle_corrections(settings: &Settings, args: CorrectionsArgs) -> Result<()> {
    let tags_path = args.tags.unwrap_or_else(|| settings.tags_path.clone());
    let corrector = Corrector::new(TagTable::load(&tags_path)?);
    corrector.corrections().dump(&args.out)?;
    println!("Corrections successfully exported! \u{2714} path='{}'", args.out.display());
    Ok(())
}

fn handle_describe(args: DescribeArgs) -> Result<()> {
    let taxonomy = Taxonomy::load(&args.taxonomy)?;

    if let Some(position) = args.position {
        for (key, record) in taxonomy.filter(NAME_SEQ_FIELD, &[Value::from(position)]) {
            let text = record.text(&args.field).unwrap_or_else(|| NOT_FOUND_TEXT.to_string());
            println!("{key}\t{text}");
        }
        return Ok(());
    }

    let filename = args.filename.unwrap_or_default();
    for (index, fragment) in stem_fragments(&filename).iter().enumerate() {
        let positional = format!("{}-{}", index + 1, fragment);
        let text = taxonomy
            .text_for(&positional, &args.field)
            .or_else(|| taxonomy.text_for(fragment, &args.field))
            .unwrap_or_else(|| NOT_FOUND_TEXT.to_string());
        println!("{}\t{}\t{}", index + 1, fragment, text);
    }
    Ok(())
}
