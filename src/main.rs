//! Beacon CLI entry point.
//!
//! Reads chat text from a file argument or stdin, runs one analysis, and
//! prints either a human-readable report or the serialized result. All
//! detection logic lives in the library; this binary is presentation only.

use std::env;
use std::fs;
use std::io::Read;
use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beacon::classifier::LexicalClassifier;
use beacon::config::{load_rules, EngineConfig};
use beacon::models::RiskLevel;
use beacon::pipeline::DetectionPipeline;

const USAGE: &str = "Usage: beacon [OPTIONS] [FILE]

Analyze chat text for risk indicators. Reads FILE, or stdin if omitted.

Options:
  --json      Print the full result as JSON
  --no-ml     Disable the built-in semantic classifier
  --version   Print version information
  --help      Print this help

Environment:
  RULES_CONFIG_PATH   Path to a JSON rules file (default: built-in set)
  RULES_WEIGHT        Weight for rule-based scores (default: 0.6)
  ML_WEIGHT           Weight for classifier scores (default: 0.4)";

struct CliArgs {
    file: Option<String>,
    json: bool,
    no_ml: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let text = match read_input(args.file.as_deref()) {
        Ok(text) => text,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let rules = match load_rules() {
        Ok(rules) => rules,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match DetectionPipeline::new(rules, EngineConfig::from_env()) {
        Ok(pipeline) => pipeline,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };
    let pipeline = if args.no_ml {
        pipeline
    } else {
        pipeline.with_classifier(Box::new(LexicalClassifier::new()))
    };

    let result = pipeline.analyze(&text);

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                eprintln!("failed to serialize result: {error}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    print_report(&result);
    ExitCode::SUCCESS
}

fn parse_args() -> Result<Option<CliArgs>, String> {
    let mut args = CliArgs {
        file: None,
        json: false,
        no_ml: false,
    };
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--json" => args.json = true,
            "--no-ml" => args.no_ml = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(None);
            }
            "--version" | "-V" => {
                println!(
                    "beacon {} (built {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("BUILD_TIMESTAMP")
                );
                return Ok(None);
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            path => {
                if args.file.replace(path.to_string()).is_some() {
                    return Err("only one input file is supported".to_string());
                }
            }
        }
    }
    Ok(Some(args))
}

fn read_input(file: Option<&str>) -> Result<String, String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(text)
        }
    }
}

fn print_report(result: &beacon::models::DetectionResult) {
    let light = match result.risk_level {
        RiskLevel::Green => "GREEN",
        RiskLevel::Yellow => "YELLOW",
        RiskLevel::Red => "RED",
    };
    println!("Verdict: {light} (score {:.2})", result.overall_score);
    println!();
    println!("{}", result.explanation);

    if !result.matches.is_empty() {
        println!();
        println!("Evidence:");
        for (category, matches) in &result.matches {
            for found in matches {
                println!("  [{}] \"{}\"", category.as_str(), found.matched_text);
            }
        }
    }

    if !result.advice.is_empty() {
        println!();
        println!("What you can do:");
        for advice in &result.advice {
            println!("  - {advice}");
        }
    }

    if !result.ml_available {
        println!();
        println!("(semantic classifier unavailable; rules-only analysis)");
    }
}
