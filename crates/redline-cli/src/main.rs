use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use redline_core::rules::policy::load_policies;
use redline_core::{CatalogBuild, CatalogBuilder, Engine, EngineConfig};

use report::{CatalogInfo, FragmentReport, Report, ToolInfo};

mod args;
mod input;
mod report;

fn main() -> Result<()> {
    let args = args::Args::parse();
    init_logging(args.log_level.as_deref());

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let CatalogBuild { catalog, rejected } = build_catalog(&args)?;

    if args.list_rules {
        let rules = report::rule_summaries(&catalog);
        let output = match args.format {
            args::OutputFormat::Json => serde_json::to_string_pretty(&rules)?,
            args::OutputFormat::Text => report::render_rules_text(&rules),
        };
        return emit(&output, args.out.as_deref());
    }

    let tool = ToolInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: args.commit.clone(),
    };
    let catalog_info = CatalogInfo::new(&catalog, &rejected);
    let engine = Engine::new(catalog, config);

    let fragments = input::read_inputs(&args.inputs)?
        .into_iter()
        .map(|fragment| {
            let verdict = engine.evaluate(&args.session, &fragment.text);
            info!(
                input = %fragment.label,
                action = %verdict.action,
                matches = verdict.matches.len(),
                "input evaluated"
            );
            FragmentReport::new(fragment, verdict)
        })
        .collect();

    let report = Report::new(tool, catalog_info, fragments);

    let output = match args.format {
        args::OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        args::OutputFormat::Text => report::render_text(&report),
    };
    emit(&output, args.out.as_deref())?;

    std::process::exit(report.aggregate.exit_code);
}

/// `--log-level` wins over RUST_LOG; the default is `warn`. Logs go to
/// stderr so stdout stays machine-readable.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn build_catalog(args: &args::Args) -> Result<CatalogBuild> {
    let mut builder = CatalogBuilder::new();
    if !args.no_builtin {
        builder = builder.builtin();
    }
    for path in &args.policies {
        for policy in load_policies(path)? {
            builder = builder.policy(&policy);
        }
    }
    Ok(builder.build())
}

fn emit(output: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("failed to write output: {}", path.display())),
        None => {
            print!("{output}");
            Ok(())
        }
    }
}
