//! Hostmill CLI
//!
//! Compiles blocklist configurations and lints individual filter lists.

mod http;
mod stats;

use std::fs;
use std::io::Write;
use std::time::Instant;

use clap::{Parser, Subcommand};

use hostmill_compiler::diagnostics::CollectingObserver;
use hostmill_compiler::fetch::{CompositeFetcher, FileFetcher};
use hostmill_compiler::transform::{instantiate, TransformContext};
use hostmill_compiler::{Compiler, Configuration, TransformationKind};

use http::HttpFetcher;
use stats::StageStats;

#[derive(Parser)]
#[command(name = "hostmill")]
#[command(about = "Compiles DNS blocklists from hosts and adblock sources")]
struct Cli {
    /// Verbose output (per-stage statistics, debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a list configuration into a single blocklist
    Compile {
        /// Path to the JSON configuration
        #[arg(short, long)]
        config: String,

        /// Output list file
        #[arg(short, long, default_value = "blocklist.txt")]
        output: String,

        /// Target platform for !#if platform conditions
        #[arg(long)]
        platform: Option<String>,

        /// Public Suffix List file for exact suffix validation
        #[arg(long)]
        psl: Option<String>,
    },

    /// Validate a single filter list and report rejected rules
    Lint {
        /// Filter list file to check
        #[arg(short, long)]
        input: String,

        /// Accept IP-literal rules
        #[arg(long)]
        allow_ip: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let result = match cli.command {
        Commands::Compile {
            config,
            output,
            platform,
            psl,
        } => cmd_compile(&config, &output, platform, psl.as_deref(), cli.verbose),
        Commands::Lint { input, allow_ip } => cmd_lint(&input, allow_ip),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_compile(
    config_path: &str,
    output: &str,
    platform: Option<String>,
    psl: Option<&str>,
    verbose: bool,
) -> Result<(), String> {
    if let Some(psl_path) = psl {
        let text = fs::read_to_string(psl_path)
            .map_err(|e| format!("Failed to read '{psl_path}': {e}"))?;
        hostmill_core::psl::install_list(&text).map_err(|e| e.to_string())?;
    }
    if !hostmill_core::psl::has_list() {
        log::info!("no public suffix list installed, using the builtin heuristic");
    }

    let config_text = fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read '{config_path}': {e}"))?;
    let mut config: Configuration = serde_json::from_str(&config_text)
        .map_err(|e| format!("Invalid configuration '{config_path}': {e}"))?;

    if platform.is_some() {
        config.target_platform = platform;
    }

    let fetcher = CompositeFetcher::new()
        .register(Box::new(HttpFetcher::new()))
        .register(Box::new(FileFetcher));

    let stats = StageStats::default();
    let start = Instant::now();

    let rules = Compiler::new(&fetcher)
        .with_observer(&stats)
        .compile(&config)
        .map_err(|e| format_error_chain(&e))?;

    let elapsed = start.elapsed();

    let mut file =
        fs::File::create(output).map_err(|e| format!("Failed to create '{output}': {e}"))?;
    for line in build_header(&config) {
        writeln!(file, "{line}").map_err(|e| format!("Failed to write '{output}': {e}"))?;
    }
    let body = rules.join("\n");
    file.write_all(body.as_bytes())
        .map_err(|e| format!("Failed to write '{output}': {e}"))?;

    println!("Compiled {} sources to '{}'", config.sources.len(), output);
    println!("  Rules:    {}", rules.len());
    println!("  Rejected: {}", stats.rejected());
    println!("  Time:     {:.1}ms", elapsed.as_secs_f64() * 1000.0);

    if verbose {
        stats.print_stages();
    }

    Ok(())
}

fn cmd_lint(input: &str, allow_ip: bool) -> Result<(), String> {
    let content =
        fs::read_to_string(input).map_err(|e| format!("Failed to read '{input}': {e}"))?;
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    let total = lines.len();

    let observer = CollectingObserver::new();
    let ctx = TransformContext {
        observer: &observer,
        source_name: Some(input),
    };
    let kind = if allow_ip {
        TransformationKind::ValidateAllowIp
    } else {
        TransformationKind::Validate
    };
    let kept = instantiate(kind).apply(lines, &ctx);

    let issues = observer.take_issues();
    for issue in &issues {
        println!(
            "{}:{}: {} [{}]",
            input, issue.line_number, issue.message, issue.kind
        );
    }

    println!(
        "Checked {} lines: {} kept, {} rejected",
        total,
        kept.len(),
        issues.len()
    );

    Ok(())
}

/// List header in the conventional adblock metadata format.
fn build_header(config: &Configuration) -> Vec<String> {
    let mut header = vec!["!".to_string(), format!("! Title: {}", config.name)];

    if let Some(description) = &config.description {
        header.push(format!("! Description: {description}"));
    }
    if let Some(version) = &config.version {
        header.push(format!("! Version: {version}"));
    }
    if let Some(homepage) = &config.homepage {
        header.push(format!("! Homepage: {homepage}"));
    }
    if let Some(license) = &config.license {
        header.push(format!("! License: {license}"));
    }

    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    header.push(format!("! Last modified: {now}"));
    header.push("!".to_string());
    header.push(format!(
        "! Compiled by hostmill v{}",
        env!("CARGO_PKG_VERSION")
    ));
    header.push("!".to_string());
    header
}

fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut cause = error.source();
    while let Some(err) = cause {
        message.push_str(&format!(": {err}"));
        cause = err.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_contains_metadata() {
        let config = Configuration {
            name: "My list".to_string(),
            version: Some("1.2.3".to_string()),
            ..Default::default()
        };
        let header = build_header(&config);
        assert!(header.contains(&"! Title: My list".to_string()));
        assert!(header.contains(&"! Version: 1.2.3".to_string()));
        assert!(header.iter().any(|l| l.starts_with("! Last modified:")));
    }
}
