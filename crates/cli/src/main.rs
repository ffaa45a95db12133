use clap::{Parser, Subcommand};
use serde::Serialize;

use douban_metadata_core::config::{
    config_path, load_config, load_config_from, save_config_to, set_config_key, AppConfig,
};
use douban_metadata_core::douban::{identify_with_config, plan, DoubanSource, LookupTarget};
use douban_metadata_core::error::ConfigError;
use douban_metadata_core::lookup::{MetadataQuery, MetadataSource};
use douban_metadata_core::metadata::Metadata;

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "douban-metadata")]
#[command(about = "Look up book metadata on Douban")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify a book by ISBN, Douban id, or title/author
    Identify {
        /// ISBN-10 or ISBN-13
        #[arg(long)]
        isbn: Option<String>,

        /// Douban subject id
        #[arg(long)]
        douban_id: Option<String>,

        /// Title to search for
        #[arg(long)]
        title: Option<String>,

        /// Author to search for (repeatable)
        #[arg(long = "author")]
        authors: Vec<String>,

        /// API key (overrides the config file)
        #[arg(long)]
        apikey: Option<String>,

        /// Request timeout in seconds (overrides the config file)
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the request that would be made without sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what the Douban source declares to the host
    Source,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Key (dot-separated path)
        key: String,
        /// Value
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Identify {
            isbn,
            douban_id,
            title,
            authors,
            apikey,
            timeout,
            dry_run,
        } => {
            let query = MetadataQuery {
                title: title.clone(),
                authors: (!authors.is_empty()).then(|| authors.clone()),
                isbn: isbn.clone(),
                douban_id: douban_id.clone(),
            };
            run_identify(&query, apikey.as_deref(), *timeout, *dry_run, cli.json)
        }
        Commands::Source => run_source(cli.json),
        Commands::Config { action } => run_config(action, cli.json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_identify(
    query: &MetadataQuery,
    apikey: Option<&str>,
    timeout: Option<u64>,
    dry_run: bool,
    json: bool,
) -> CliResult {
    if dry_run {
        match plan(query) {
            Some(target) => println!("{} {}", target.kind(), describe_target(&target)),
            None => println!("No request: query is empty"),
        }
        return Ok(());
    }

    let mut cfg = load_config().douban;
    if let Some(key) = apikey {
        cfg.apikey = key.to_string();
    }
    if let Some(secs) = timeout {
        cfg.timeout_secs = secs;
    }
    if cfg.apikey.is_empty() {
        tracing::info!("No apikey set; run `douban-metadata config set douban.apikey <key>`");
    }

    let results = identify_with_config(query, &cfg)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("No results found");
    } else {
        for (i, mi) in results.iter().enumerate() {
            print_record(i + 1, mi);
        }
    }
    Ok(())
}

fn describe_target(target: &LookupTarget) -> String {
    match target {
        LookupTarget::Isbn(isbn) => isbn.clone(),
        LookupTarget::Subject(id) => id.clone(),
        LookupTarget::Search(q) => format!("{:?}", q),
    }
}

fn print_record(n: usize, mi: &Metadata) {
    println!("Result {}: {}", n, mi.title);
    if !mi.authors.is_empty() {
        println!("  Authors:   {}", mi.authors.join(", "));
    }
    if let Some(p) = &mi.publisher {
        println!("  Publisher: {}", p);
    }
    if let Some(d) = &mi.pubdate {
        println!("  Published: {}", d.format("%Y-%m-%d"));
    }
    if let Some(s) = &mi.series {
        println!("  Series:    {}", s);
    }
    if let Some(r) = mi.rating {
        println!("  Rating:    {:.1}/5", r);
    }
    if let Some(isbn) = &mi.isbn {
        println!("  ISBN:      {}", isbn);
    }
    for (scheme, value) in &mi.identifiers {
        println!("  {}:{}", scheme, value);
    }
    if !mi.tags.is_empty() {
        println!("  Tags:      {}", mi.tags.join(", "));
    }
}

#[derive(Serialize)]
struct SourceReport<'a> {
    name: &'a str,
    description: &'a str,
    version: String,
    minimum_host_version: String,
    supported_platforms: &'a [&'a str],
    capabilities: Vec<String>,
    touched_fields: &'a [&'static str],
    options: Vec<OptionReport<'a>>,
}

#[derive(Serialize)]
struct OptionReport<'a> {
    name: &'a str,
    kind: String,
    default: &'a str,
    description: &'a str,
}

fn run_source(json: bool) -> CliResult {
    let cfg = load_config().douban;
    let source = DoubanSource::from_config(&cfg)?;
    let info = source.info();
    let dotted = |v: (u16, u16, u16)| format!("{}.{}.{}", v.0, v.1, v.2);

    let report = SourceReport {
        name: info.name,
        description: info.description,
        version: dotted(info.version),
        minimum_host_version: dotted(info.minimum_host_version),
        supported_platforms: info.supported_platforms,
        capabilities: source.capabilities().iter().map(|c| format!("{:?}", c).to_lowercase()).collect(),
        touched_fields: source.touched_fields(),
        options: source
            .options()
            .iter()
            .map(|o| OptionReport {
                name: o.name,
                kind: format!("{:?}", o.kind).to_lowercase(),
                default: o.default,
                description: o.description,
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} {} - {}", report.name, report.version, report.description);
        println!("Capabilities:   {}", report.capabilities.join(", "));
        println!("Touched fields: {}", report.touched_fields.join(", "));
        for o in &report.options {
            println!("Option {} ({}): {}", o.name, o.kind, o.description);
        }
    }
    Ok(())
}

fn run_config(action: &ConfigAction, json: bool) -> CliResult {
    match action {
        ConfigAction::Init => {
            let path = config_path().ok_or(ConfigError::NoConfigDir)?;
            save_config_to(&AppConfig::default(), &path)?;
            println!("Wrote default config to {}", path.display());
        }
        ConfigAction::Show => {
            let mut cfg = load_config();
            if !cfg.douban.apikey.is_empty() {
                cfg.douban.apikey = "***".to_string();
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        }
        ConfigAction::Set { key, value } => {
            let path = config_path().ok_or(ConfigError::NoConfigDir)?;
            let mut cfg = load_config_from(&path).unwrap_or_default();
            set_config_key(&mut cfg, key, value)?;
            save_config_to(&cfg, &path)?;
            if !json {
                println!("Updated {}", key);
            }
        }
    }
    Ok(())
}
