//! Command-line entry point for the batch PDF suite.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use pdfsuite::{
    load_config, worker, BatchRunner, InputFile, ItemOutcome, ItemOutput, Job, JobStatus,
    Operation, ProgressEvent, SuiteConfig,
};

const USAGE: &str = "\
Usage: pdfsuite <command> [options] <file.pdf>...

Commands:
  to-word                       Convert each PDF to a Word document
  remove-watermark --text TEXT  Strip images and matching text from each PDF
  compress [--quality N]        Re-encode embedded images as JPEG (1-100)
  metadata                      Print document metadata as JSON
  scan                          Print heuristic findings as JSON
  to-ebook [--title T] [--author A]
                                Export each PDF as an EPUB

Options:
  --config PATH   Load configuration from a JSON file
  --out DIR       Directory for produced files (default: current directory)
";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

struct CliArgs {
    command: String,
    options: Vec<(String, String)>,
    files: Vec<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut iter = args.iter();
    let command = iter.next().ok_or(USAGE.to_string())?.clone();

    let mut options = Vec::new();
    let mut files = Vec::new();
    while let Some(arg) = iter.next() {
        if let Some(name) = arg.strip_prefix("--") {
            let value = iter
                .next()
                .ok_or_else(|| format!("missing value for --{}", name))?;
            options.push((name.to_string(), value.clone()));
        } else {
            files.push(PathBuf::from(arg));
        }
    }

    Ok(CliArgs {
        command,
        options,
        files,
    })
}

impl CliArgs {
    fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let cli = parse_args(args)?;

    let config = match cli.option("config") {
        Some(path) => load_config(path).map_err(|e| e.to_string())?,
        None => SuiteConfig::default(),
    };

    let operation = build_operation(&cli, &config)?;
    let out_dir = PathBuf::from(cli.option("out").unwrap_or("."));

    if cli.files.is_empty() {
        return Err(format!("no input files given\n\n{}", USAGE));
    }
    let mut inputs = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let input = InputFile::from_path(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        inputs.push(input);
    }

    let runner = BatchRunner::from_config(&config);
    let job = Job::new(operation, inputs);
    let job_id = job.id.clone();
    info!(job_id = %job_id, "submitting job");

    let handle = worker::spawn(runner, job);
    while let Some(event) = handle.recv_event() {
        match event {
            ProgressEvent::ItemStarted { index, input_name } => {
                eprintln!("[{}] processing {}", index + 1, input_name);
            }
            ProgressEvent::ItemFinished {
                index,
                input_name,
                success,
                error,
            } => {
                if success {
                    eprintln!("[{}] done {}", index + 1, input_name);
                } else {
                    eprintln!(
                        "[{}] FAILED {}: {}",
                        index + 1,
                        input_name,
                        error.unwrap_or_default()
                    );
                }
            }
            ProgressEvent::JobFinished { .. } => {}
        }
    }

    let report = handle.wait().map_err(|e| e.to_string())?;
    render_report(&report.results, &out_dir)?;
    eprintln!("job {} finished: {:?}", report.job_id, report.status);

    if report.status == JobStatus::Failed {
        return Err("all items failed".to_string());
    }
    Ok(())
}

fn build_operation(cli: &CliArgs, config: &SuiteConfig) -> Result<Operation, String> {
    match cli.command.as_str() {
        "to-word" => Ok(Operation::ConvertToWord),
        "remove-watermark" => {
            let text = cli
                .option("text")
                .ok_or_else(|| "remove-watermark requires --text".to_string())?;
            Ok(Operation::RemoveWatermark {
                text: text.to_string(),
            })
        }
        "compress" => {
            let quality = match cli.option("quality") {
                Some(value) => value
                    .parse::<u8>()
                    .ok()
                    .filter(|q| (1..=100).contains(q))
                    .ok_or_else(|| format!("invalid --quality '{}', expected 1-100", value))?,
                None => config.compression_quality,
            };
            Ok(Operation::Compress { quality })
        }
        "metadata" => Ok(Operation::ExtractMetadata),
        "scan" => Ok(Operation::ScanSuspicious),
        "to-ebook" => Ok(Operation::ConvertToEbook {
            title: cli.option("title").unwrap_or("Untitled").to_string(),
            author: cli.option("author").unwrap_or("Unknown").to_string(),
        }),
        other => Err(format!("unknown command '{}'\n\n{}", other, USAGE)),
    }
}

fn render_report(results: &[pdfsuite::ItemResult], out_dir: &Path) -> Result<(), String> {
    for result in results {
        match &result.outcome {
            ItemOutcome::Success(ItemOutput::Document {
                file_name,
                bytes,
                warnings,
            }) => {
                std::fs::create_dir_all(out_dir)
                    .map_err(|e| format!("cannot create {}: {}", out_dir.display(), e))?;
                let path = out_dir.join(file_name);
                std::fs::write(&path, bytes)
                    .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
                println!("{}", path.display());
                for warning in warnings {
                    eprintln!("  warning: {}", warning);
                }
            }
            ItemOutcome::Success(ItemOutput::Metadata(metadata)) => {
                let json =
                    serde_json::to_string_pretty(metadata).map_err(|e| e.to_string())?;
                println!("{}", json);
            }
            ItemOutcome::Success(ItemOutput::Findings(report)) => {
                let json = serde_json::to_string_pretty(report).map_err(|e| e.to_string())?;
                println!("{}", json);
            }
            ItemOutcome::Failure { message, .. } => {
                eprintln!("{}: {}", result.input_name, message);
            }
        }
    }
    Ok(())
}
