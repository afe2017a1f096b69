use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use girder_graph::{AccessDetail, JavaClasses};
use girder_import::{ClassFileImporter, ClasspathEntry, ClasspathLocator};

#[derive(Parser)]
#[command(name = "girder", version, about = "Girder CLI (class-file import, dependency graph)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import class directories, JARs or .class files and print a summary
    Import(ImportArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Input locations: class directories, JAR archives, or .class files
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Additional classpath entries used to resolve referenced classes
    #[arg(long)]
    classpath: Vec<PathBuf>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Import(args) => run_import(args),
    }
}

#[derive(Serialize)]
struct ImportReport {
    classes: usize,
    stubs: usize,
    dependency_edges: usize,
    try_catch_blocks: usize,
    unresolved_targets: usize,
}

fn run_import(args: ImportArgs) -> Result<()> {
    let locator = ClasspathLocator::new(
        args.classpath
            .iter()
            .map(|path| ClasspathEntry::for_path(path))
            .collect(),
    );
    let classes = ClassFileImporter::with_locator(&locator)
        .import_paths(&args.paths)
        .context("import failed")?;

    let report = summarize(&classes);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} classes ({} stubs), {} dependency edges, {} try/catch blocks, {} unresolved targets",
            report.classes,
            report.stubs,
            report.dependency_edges,
            report.try_catch_blocks,
            report.unresolved_targets,
        );
        for class in classes.iter().filter(|class| !class.stub) {
            println!("  {} ({} edges)", class.name(), class.accesses.len());
        }
    }
    Ok(())
}

fn summarize(classes: &JavaClasses) -> ImportReport {
    let mut report = ImportReport {
        classes: classes.len(),
        stubs: 0,
        dependency_edges: 0,
        try_catch_blocks: 0,
        unresolved_targets: 0,
    };
    for class in classes.iter() {
        if class.stub {
            report.stubs += 1;
        }
        report.dependency_edges += class.accesses.len();
        report.try_catch_blocks += class.try_catch_blocks.len();
        for access in &class.accesses {
            let unresolved = match &access.detail {
                AccessDetail::FieldAccess { resolved, .. }
                | AccessDetail::ConstructorCall { resolved, .. }
                | AccessDetail::ConstructorReference { resolved, .. } => resolved.is_none(),
                AccessDetail::MethodCall { resolved, .. }
                | AccessDetail::MethodReference { resolved, .. } => resolved.is_empty(),
                AccessDetail::ClassObject { .. } | AccessDetail::InstanceofCheck { .. } => false,
            };
            if unresolved {
                report.unresolved_targets += 1;
            }
        }
    }
    report
}
