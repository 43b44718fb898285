//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the timetable API to `openapi.json` (or the
//! path given as the first argument). With `--check` nothing is written; the
//! command fails when the file on disk no longer matches the routes, which
//! keeps a committed copy honest in CI.

use std::path::Path;
use timetable_api::web::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_PATH: &str = "openapi.json";

struct Args {
    path: String,
    check: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut path = None;
    let mut check = false;
    for arg in args {
        match arg.as_str() {
            "--check" => check = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
            _ if path.is_some() => return Err("expected at most one output path".to_string()),
            _ => path = Some(arg),
        }
    }
    Ok(Args {
        path: path.unwrap_or_else(|| DEFAULT_PATH.to_string()),
        check,
    })
}

/// Compares documents by content, so formatting differences do not count as drift.
fn is_current(existing: &str, generated: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(existing),
        serde_json::from_str::<serde_json::Value>(generated),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let generated = ApiDoc::openapi().to_pretty_json()?;
    let existing = std::fs::read_to_string(Path::new(&args.path)).ok();
    let current = existing.as_deref().is_some_and(|e| is_current(e, &generated));

    if args.check {
        if !current {
            return Err(format!("{} is out of date; rerun `cargo run --bin openapi`", args.path).into());
        }
        println!("{} is up to date", args.path);
    } else if current {
        println!("{} unchanged", args.path);
    } else {
        std::fs::write(&args.path, generated)?;
        println!("OpenAPI document written to {}", args.path);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    run(args)
}
