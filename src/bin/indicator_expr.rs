// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CLI for program indicator expressions
//!
//! Describes, validates, evaluates and translates expressions against
//! metadata loaded from a JSON file.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicator_expression::model::{InMemoryMetadata, InMemoryValues};
use indicator_expression::{
    AnalyticsType, EngineConfig, InMemoryProgramIndicatorStore, ProgramIndicator,
    ProgramIndicatorEngine, ResultType, parse,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "indicator-expr")]
#[command(about = "Describe, validate, evaluate and translate program indicator expressions")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    /// JSON file with data elements, program stages, attributes, constants and relationship types
    #[arg(short, long, global = true)]
    metadata: Option<PathBuf>,
    /// TOML engine configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnalyticsTypeArg {
    Event,
    Enrollment,
}

impl From<AnalyticsTypeArg> for AnalyticsType {
    fn from(value: AnalyticsTypeArg) -> Self {
        match value {
            AnalyticsTypeArg::Event => AnalyticsType::Event,
            AnalyticsTypeArg::Enrollment => AnalyticsType::Enrollment,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression and print its syntax tree
    Parse {
        /// Expression to parse
        expression: String,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print an expression with item references replaced by their names
    Describe {
        /// Expression to describe
        expression: String,
        /// Describe as a boolean filter
        #[arg(long)]
        filter: bool,
    },
    /// Check an expression or filter
    Validate {
        /// Expression to validate
        expression: String,
        /// Validate as a boolean filter
        #[arg(long)]
        filter: bool,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Translate an expression into analytics SQL
    Sql {
        /// Expression to translate
        expression: String,
        /// Program of the indicator
        #[arg(short, long)]
        program: String,
        /// First day of the reporting period
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the reporting period
        #[arg(long)]
        end: NaiveDate,
        /// Analytics type of the indicator
        #[arg(short, long, value_enum, default_value = "event")]
        analytics_type: AnalyticsTypeArg,
    },
    /// Print the clause testing whether any referenced value exists
    Exists {
        /// Expression to inspect
        expression: String,
        /// Analytics type of the indicator
        #[arg(short, long, value_enum, default_value = "event")]
        analytics_type: AnalyticsTypeArg,
    },
    /// List the data element and attribute identifiers of an expression
    Identifiers {
        /// Expression to inspect
        expression: String,
        /// Analytics type of the indicator
        #[arg(short, long, value_enum, default_value = "event")]
        analytics_type: AnalyticsTypeArg,
    },
    /// Compute an expression from values in a JSON file
    Evaluate {
        /// Expression to evaluate
        expression: String,
        /// JSON file with stage values, attributes, event dates and variables
        #[arg(short, long)]
        values: PathBuf,
        /// Evaluate as a boolean filter
        #[arg(long)]
        filter: bool,
    },
}

fn main() {
    // Setup human-panic for better error messages
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "✗".red());
        process::exit(1);
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Error reading file '{}'", path.display()))
}

fn load_engine(metadata: Option<&Path>, config: Option<&Path>) -> Result<ProgramIndicatorEngine> {
    let metadata = match metadata {
        Some(path) => InMemoryMetadata::from_json(&read_file(path)?)
            .with_context(|| format!("Error parsing metadata '{}'", path.display()))?,
        None => InMemoryMetadata::new(),
    };
    let config = match config {
        Some(path) => EngineConfig::from_toml(&read_file(path)?)
            .with_context(|| format!("Error parsing config '{}'", path.display()))?,
        None => EngineConfig::default(),
    };
    Ok(ProgramIndicatorEngine::with_config(
        Arc::new(metadata),
        Arc::new(InMemoryProgramIndicatorStore::new()),
        config,
    ))
}

fn result_type(filter: bool) -> ResultType {
    if filter {
        ResultType::Boolean
    } else {
        ResultType::Double
    }
}

fn run(cli: Cli) -> Result<()> {
    let engine = load_engine(cli.metadata.as_deref(), cli.config.as_deref())?;

    match cli.command {
        Commands::Parse { expression, quiet } => {
            let ast = parse(&expression).context("Parse error")?;
            if quiet {
                println!("OK");
            } else {
                println!("{} Expression parsed successfully", "✓".green());
                println!("Expression: {ast}");
                println!("AST: {ast:#?}");
            }
        }
        Commands::Describe { expression, filter } => {
            let description = if filter {
                engine.filter_description(&expression)?
            } else {
                engine.expression_description(&expression)?
            };
            println!("{description}");
        }
        Commands::Validate {
            expression,
            filter,
            quiet,
        } => match engine.validate(&expression, Some(result_type(filter))) {
            Ok(descriptions) => {
                if quiet {
                    println!("VALID");
                } else {
                    println!("{} Expression is valid", "✓".green());
                    for (item, label) in &descriptions {
                        println!("  {} {label}", item.cyan());
                    }
                }
            }
            Err(e) => {
                if quiet {
                    eprintln!("INVALID");
                } else {
                    eprintln!("{} Invalid expression: {e}", "✗".red());
                }
                process::exit(1);
            }
        },
        Commands::Sql {
            expression,
            program,
            start,
            end,
            analytics_type,
        } => {
            let indicator = ProgramIndicator::new("cli", "CLI indicator", program, &expression)
                .with_analytics_type(analytics_type.into());
            println!("{}", engine.analytics_sql(&expression, &indicator, start, end)?);
        }
        Commands::Exists {
            expression,
            analytics_type,
        } => match engine.any_value_exists_clause(&expression, analytics_type.into()) {
            Some(clause) => println!("{clause}"),
            None => println!("{}", "(no clause)".dimmed()),
        },
        Commands::Identifiers {
            expression,
            analytics_type,
        } => {
            for identifier in
                engine.data_element_and_attribute_identifiers(&expression, analytics_type.into())?
            {
                println!("{identifier}");
            }
        }
        Commands::Evaluate {
            expression,
            values,
            filter,
        } => {
            let values = InMemoryValues::from_json(&read_file(&values)?)
                .with_context(|| format!("Error parsing values '{}'", values.display()))?;
            let value = engine.evaluate(&expression, &values, Some(result_type(filter)), None)?;
            println!("{}", value.to_string().green());
        }
    }
    Ok(())
}
