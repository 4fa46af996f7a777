use std::fs;

use anyhow::{Context, Result, bail};
use node_origin::origin_script::{OriginScript, replay_origin_script};
use node_origin::{render_origin_json_lines, render_origin_summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Summary,
    JsonLines,
}

fn main() {
    if let Err(error) = run(std::env::args().skip(1).collect()) {
        eprintln!("{error:#}");
        std::process::exit(2);
    }
}

fn run(args: Vec<String>) -> Result<()> {
    let mut input_path: Option<&str> = None;
    let mut format = OutputFormat::Json;

    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--input" => {
                index += 1;
                let value = args.get(index).context("--input requires a path")?;
                input_path = Some(value.as_str());
            }
            "--summary" => format = OutputFormat::Summary,
            "--json-lines" => format = OutputFormat::JsonLines,
            "help" | "--help" | "-h" => {
                println!("{}", usage());
                return Ok(());
            }
            flag => bail!("unknown flag: {flag}\n\n{}", usage()),
        }
        index += 1;
    }

    let path = input_path.with_context(|| format!("missing required --input <path>\n\n{}", usage()))?;
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let script: OriginScript =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse script {path}"))?;
    let outcome = replay_origin_script(&script)
        .with_context(|| format!("failed to replay script {path}"))?;
    let include_unknown = outcome.tracker.config().include_unknown;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&outcome.report).context("failed to encode report")?
        ),
        OutputFormat::Summary => println!("{}", render_origin_summary(&outcome.report, include_unknown)),
        OutputFormat::JsonLines => println!(
            "{}",
            render_origin_json_lines(&outcome.report, include_unknown)
                .context("failed to encode report lines")?
        ),
    }
    Ok(())
}

fn usage() -> String {
    [
        "node_origin_report usage:",
        "  node_origin_report --input <script.json> [--summary | --json-lines]",
    ]
    .join("\n")
}
