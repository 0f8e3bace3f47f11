//! Strata CLI - run the middle-end over a surface program

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use log::{debug, error};

use strata_ast::surface::{LowerError, SurfaceProgram};
use strata_ast::{dump, Diagnostic, Program, Severity, Span};
use strata_pipeline::{
    DumpAfter, DumpBackend, Outcome, Pipeline, PipelineConfig, PipelineError, PASSES,
};

/// Exit code for a run stopped by diagnostics in the user's program
const EXIT_ABORTED: u8 = 1;
/// Exit code for compiler defects and unreadable input
const EXIT_DEFECT: u8 = 2;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata whole-program compiler middle-end", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every pass over a surface program (JSON)
    Run {
        /// Input file
        file: PathBuf,
        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Time each pass
        #[arg(long)]
        timing: bool,
        /// Collect per-pass statistics
        #[arg(long)]
        stats: bool,
        /// Dump the program after the named pass (repeatable)
        #[arg(long = "dump-after", value_name = "PASS")]
        dump_after: Vec<String>,
        /// Dump the program after every pass
        #[arg(long, conflicts_with = "dump_after")]
        dump_every: bool,
        /// Skip structural verification at checkpoints
        #[arg(long)]
        no_verify: bool,
        /// Original source text, for rendering diagnostics in context
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// Print the run report and diagnostics as JSON
        #[arg(long)]
        json: bool,
        /// Print the final program once every pass completed
        #[arg(long)]
        emit: bool,
    },
    /// Print the structural dump of a surface program without running passes
    Dump {
        /// Input file
        file: PathBuf,
    },
    /// List the passes in the order they run
    Passes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            file,
            config,
            timing,
            stats,
            dump_after,
            dump_every,
            no_verify,
            source,
            json,
            emit,
        } => {
            let mut config = match config {
                Some(path) => match PipelineConfig::load(&path) {
                    Ok(config) => config,
                    Err(e) => return defect(&e),
                },
                None => PipelineConfig::default(),
            };
            config.timing |= timing;
            config.stats |= stats;
            if dump_every {
                config.dump = DumpAfter::Every;
            } else if !dump_after.is_empty() {
                config.dump = DumpAfter::Passes(dump_after);
            }
            if no_verify {
                config.verify = false;
            }
            let options = RunOptions {
                source,
                json,
                emit,
            };
            cmd_run(&file, config, &options)
        }
        Commands::Dump { file } => cmd_dump(&file),
        Commands::Passes => {
            for (i, pass) in PASSES.iter().enumerate() {
                println!("{:>2}. {}", i + 1, pass.name);
            }
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

struct RunOptions {
    source: Option<PathBuf>,
    json: bool,
    emit: bool,
}

fn cmd_run(file: &Path, config: PipelineConfig, options: &RunOptions) -> ExitCode {
    let source = match &options.source {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => Some((path.clone(), text)),
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                return ExitCode::from(EXIT_DEFECT);
            }
        },
        None => None,
    };
    let program = match load(file, source.as_ref()) {
        Some(program) => program,
        None => return ExitCode::from(EXIT_DEFECT),
    };

    let mut pipeline = match Pipeline::new(program, config) {
        Ok(pipeline) => pipeline,
        Err(e) => return defect(&e),
    };
    let mut backend = DumpBackend::new();
    let outcome = match pipeline.run(&mut backend) {
        Ok(outcome) => outcome,
        Err(e) => return defect(&e),
    };

    if options.json {
        let document = serde_json::json!({
            "report": pipeline.report(),
            "diagnostics": pipeline.diagnostics().iter().collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&document) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error writing report: {}", e);
                return ExitCode::from(EXIT_DEFECT);
            }
        }
    } else {
        for record in &pipeline.report().passes {
            if let Some(dump) = &record.dump {
                println!("=== after {} ===", record.pass);
                print!("{}", dump);
            }
        }
        for diagnostic in pipeline.diagnostics().iter() {
            render(diagnostic, source.as_ref());
        }
        let totals = pipeline.report().totals;
        match outcome {
            Outcome::Completed => eprintln!(
                "✓ {} - {} passes completed, {} warnings",
                file.display(),
                pipeline.report().passes.len(),
                totals.warnings
            ),
            Outcome::Aborted { pass, .. } => eprintln!(
                "✗ {} - aborted after {} ({} fatal, {} errors, {} warnings)",
                file.display(),
                pass,
                totals.fatal,
                totals.errors,
                totals.warnings
            ),
            Outcome::Pending => {}
        }
        if options.emit {
            if let Some(output) = backend.output() {
                print!("{}", output);
            }
        }
    }

    match outcome {
        Outcome::Completed => ExitCode::SUCCESS,
        _ => ExitCode::from(EXIT_ABORTED),
    }
}

fn cmd_dump(file: &Path) -> ExitCode {
    match load(file, None) {
        Some(program) => {
            print!("{}", dump(&program));
            ExitCode::SUCCESS
        }
        None => ExitCode::from(EXIT_DEFECT),
    }
}

/// Read and lower a surface program, reporting any failure
fn load(file: &Path, source: Option<&(PathBuf, String)>) -> Option<Program> {
    let text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {}", file.display(), e);
            return None;
        }
    };
    let surface = match SurfaceProgram::from_json(&text) {
        Ok(surface) => surface,
        Err(e) => {
            eprintln!("Error parsing {}: {}", file.display(), e);
            return None;
        }
    };
    debug!("lowering {} modules", surface.modules.len());
    match surface.lower() {
        Ok(program) => Some(program),
        Err(e) => {
            report_lower_error(&e, source);
            None
        }
    }
}

fn defect(err: &PipelineError) -> ExitCode {
    error!("compiler defect: {}", err);
    eprintln!("internal compiler error[{}]: {}", err.code(), err);
    ExitCode::from(EXIT_DEFECT)
}

fn report_lower_error(err: &LowerError, source: Option<&(PathBuf, String)>) {
    let message = format!("[{}] {}", err.code(), err);
    match source {
        Some((path, text)) => print_report(
            ReportKind::Error,
            Color::Red,
            path,
            text,
            err.span(),
            &message,
            &[],
        ),
        None => eprintln!("error[{}]: {}", err.code(), err),
    }
}

fn render(diagnostic: &Diagnostic, source: Option<&(PathBuf, String)>) {
    let Some((path, text)) = source else {
        eprintln!("{}", diagnostic);
        for note in &diagnostic.notes {
            eprintln!("  note: {}", note.message);
        }
        return;
    };
    let (kind, color) = match diagnostic.severity {
        Severity::Fatal => (ReportKind::Custom("fatal error", Color::Red), Color::Red),
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
    };
    let notes: Vec<(Span, &str)> = diagnostic
        .notes
        .iter()
        .map(|n| (n.span, n.message.as_str()))
        .collect();
    print_report(
        kind,
        color,
        path,
        text,
        diagnostic.span,
        &format!("[{}] {}", diagnostic.code, diagnostic.message),
        &notes,
    );
}

fn print_report(
    kind: ReportKind<'_>,
    color: Color,
    path: &Path,
    text: &str,
    span: Span,
    message: &str,
    notes: &[(Span, &str)],
) {
    let name = path.to_string_lossy().to_string();
    let clamp = |s: Span| {
        let start = s.start.min(text.len());
        start..s.end.clamp(start, text.len())
    };
    let mut report = Report::build(kind, name.clone(), clamp(span).start)
        .with_message(message)
        .with_label(
            Label::new((name.clone(), clamp(span)))
                .with_message(message)
                .with_color(color),
        );
    for (note_span, note) in notes {
        report = report.with_label(
            Label::new((name.clone(), clamp(*note_span)))
                .with_message(*note)
                .with_color(Color::Blue),
        );
    }
    if let Err(e) = report.finish().eprint((name, Source::from(text))) {
        eprintln!("{}", message);
        debug!("could not render report: {}", e);
    }
}
