//! CLI entry point for the traffic puzzle solver.
//!
//! Usage:
//!   traffic-solver solve <level.json> [options]
//!   traffic-solver solve --stdin [options]
//!
//! Options:
//!   --max-states <n>     Maximum states to explore (default: 1000000)
//!   --timeout <seconds>  Maximum search time (default: 15)
//!   --skip-validation    Solve without checking the initial placement
//!
//! Exit codes: 0 solvable, 1 not solvable, 2 invalid input.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use traffic_solver::{
    load_level, solve, validate_initial_state, LevelConfig, SolverConfig, SolverResult,
};

const EXIT_SOLVABLE: i32 = 0;
const EXIT_UNSOLVABLE: i32 = 1;
const EXIT_INVALID_INPUT: i32 = 2;

#[derive(Parser)]
#[command(name = "traffic-solver")]
#[command(about = "Breadth-first solver for vehicle exit puzzles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a level and report the exit order or why it is stuck
    Solve {
        /// Path to level JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read level from stdin instead of file
        #[arg(long)]
        stdin: bool,

        /// Maximum number of states to explore
        #[arg(long, default_value = "1000000")]
        max_states: usize,

        /// Maximum search time in seconds
        #[arg(long, default_value = "15")]
        timeout: u64,

        /// Skip placement and path checks on the initial state
        #[arg(long)]
        skip_validation: bool,
    },
}

/// Output format for a completed search
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveOutput {
    solvable: bool,
    solution: Vec<String>,
    total_moves: usize,
    blocking_details: Vec<BlockingOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    termination: &'static str,
    states_explored: usize,
    max_depth: usize,
    time_elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockingOutput {
    blocked: String,
    blocked_by: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct ErrorOutput {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl ErrorBody {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_REQUEST",
            message: message.into(),
            details: None,
        }
    }

    fn invalid_level(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_LEVEL_DATA",
            message: message.into(),
            details: None,
        }
    }

    fn validation(details: Vec<String>) -> Self {
        Self {
            code: "VALIDATION_ERROR",
            message: "Level validation failed".to_string(),
            details: Some(details),
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            file,
            stdin,
            max_states,
            timeout,
            skip_validation,
        } => {
            let config = SolverConfig {
                max_states,
                timeout: Duration::from_secs(timeout),
            };

            let code = match run_solve(file, stdin, &config, skip_validation) {
                Ok(result) => {
                    print_json(&format_result(&result));
                    if result.solvable {
                        EXIT_SOLVABLE
                    } else {
                        EXIT_UNSOLVABLE
                    }
                }
                Err(error) => {
                    print_json(&ErrorOutput { error });
                    EXIT_INVALID_INPUT
                }
            };

            std::process::exit(code);
        }
    }
}

/// Events go to stderr so stdout carries only the JSON result
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_solve(
    file: Option<PathBuf>,
    stdin: bool,
    config: &SolverConfig,
    skip_validation: bool,
) -> Result<SolverResult, ErrorBody> {
    let json_content = read_input(file, stdin)?;

    let level: LevelConfig = serde_json::from_str(&json_content)
        .map_err(|e| ErrorBody::invalid_request(format!("Error parsing level JSON: {}", e)))?;

    let loaded = load_level(&level).map_err(|e| ErrorBody::invalid_level(e.to_string()))?;

    if !skip_validation {
        let errors = validate_initial_state(&loaded.graph, &loaded.initial_state);
        if !errors.is_empty() {
            return Err(ErrorBody::validation(errors));
        }
    }

    solve(&loaded.graph, &loaded.initial_state, config)
        .map_err(|e| ErrorBody::invalid_level(e.to_string()))
}

fn read_input(file: Option<PathBuf>, stdin: bool) -> Result<String, ErrorBody> {
    if stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| ErrorBody::invalid_request(format!("Failed to read from stdin: {}", e)))?;
        Ok(buffer)
    } else if let Some(path) = file {
        fs::read_to_string(&path).map_err(|e| {
            ErrorBody::invalid_request(format!("Failed to read file {:?}: {}", path, e))
        })
    } else {
        Err(ErrorBody::invalid_request(
            "Must provide either a file path or --stdin",
        ))
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}

fn format_result(result: &SolverResult) -> SolveOutput {
    SolveOutput {
        solvable: result.solvable,
        solution: result.solution.clone(),
        total_moves: result.total_moves,
        blocking_details: result
            .blocking_details
            .iter()
            .map(|detail| BlockingOutput {
                blocked: detail.blocked.clone(),
                blocked_by: detail.blocked_by.to_string(),
                reason: detail.reason.clone(),
            })
            .collect(),
        reason: result.reason.clone(),
        termination: result.termination.as_str(),
        states_explored: result.states_explored,
        max_depth: result.max_depth,
        time_elapsed_ms: result.time_elapsed_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use traffic_solver::{BlockedBy, BlockingDetail, Termination};

    #[test]
    fn test_format_solved_result() {
        let result = SolverResult {
            solvable: true,
            solution: vec!["C2".to_string(), "C1".to_string()],
            total_moves: 2,
            blocking_details: Vec::new(),
            reason: None,
            termination: Termination::Solved,
            states_explored: 3,
            max_depth: 2,
            time_elapsed_ms: 1,
        };

        let value = serde_json::to_value(format_result(&result)).unwrap();
        assert_eq!(
            value,
            json!({
                "solvable": true,
                "solution": ["C2", "C1"],
                "totalMoves": 2,
                "blockingDetails": [],
                "termination": "SOLVED",
                "statesExplored": 3,
                "maxDepth": 2,
                "timeElapsedMs": 1
            })
        );
    }

    #[test]
    fn test_format_blocked_result() {
        let result = SolverResult {
            solvable: false,
            solution: Vec::new(),
            total_moves: 0,
            blocking_details: vec![
                BlockingDetail {
                    blocked: "C1".to_string(),
                    blocked_by: BlockedBy::Obstacle("O1".to_string()),
                    reason: "BOULDER O1 blocks C1's path at (3, 1)".to_string(),
                },
                BlockingDetail {
                    blocked: "C2".to_string(),
                    blocked_by: BlockedBy::InvalidPath,
                    reason: "dead end".to_string(),
                },
            ],
            reason: Some("Exhausted all possibilities.".to_string()),
            termination: Termination::Exhausted,
            states_explored: 1,
            max_depth: 0,
            time_elapsed_ms: 0,
        };

        let value = serde_json::to_value(format_result(&result)).unwrap();
        assert_eq!(value["termination"], "EXHAUSTED");
        assert_eq!(value["reason"], "Exhausted all possibilities.");
        assert_eq!(value["blockingDetails"][0]["blockedBy"], "O1");
        assert_eq!(value["blockingDetails"][1]["blockedBy"], "INVALID_PATH");
    }

    #[test]
    fn test_error_output_shape() {
        let output = ErrorOutput {
            error: ErrorBody::validation(vec!["Vehicle C1 at (0, 0) is not on a road cell".into()]),
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(value["error"]["details"].as_array().unwrap().len(), 1);

        let output = ErrorOutput {
            error: ErrorBody::invalid_request("Must provide either a file path or --stdin"),
        };
        let value = serde_json::to_value(&output).unwrap();
        assert!(value["error"].get("details").is_none());
    }

    #[test]
    fn test_missing_input_is_invalid_request() {
        let error = read_input(None, false).unwrap_err();
        assert_eq!(error.code, "INVALID_REQUEST");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["traffic-solver", "solve", "level.json"]).unwrap();
        let Commands::Solve {
            file,
            stdin,
            max_states,
            timeout,
            skip_validation,
        } = cli.command;
        assert_eq!(file, Some(PathBuf::from("level.json")));
        assert!(!stdin);
        assert_eq!(max_states, 1_000_000);
        assert_eq!(timeout, 15);
        assert!(!skip_validation);
    }
}
