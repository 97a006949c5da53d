use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use saflang::config::HostConfig;
use saflang::judge::{self, CaseOutcome, TestCase};
use saflang::ops::{Op, Program};
use saflang::parser;
use saflang::vm::{self, LogTracer, OpHistogram, Stacks, Tracer, VMOptions};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Run and judge saflang programs.
#[derive(Parser, Debug)]
#[command()]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program. Its input is read from stdin as whitespace separated integers.
    Run {
        /// File containing a saflang program.
        #[arg()]
        file: PathBuf,
        /// A limit for the number of executed instructions.
        /// If the limit is reached, the program will be stopped with an error.
        /// Defaults to SAFLANG_MAX_OPS.
        #[arg(long, short = 'l')]
        op_limit: Option<u64>,
        /// Print statistics after running the program.
        #[arg(long, short = 's')]
        stats: bool,
    },
    /// Check a program against the test cases in a directory.
    /// Every `NAME.in` file needs a `NAME.out` file with the exact expected output.
    Judge {
        /// File containing a saflang program.
        #[arg()]
        file: PathBuf,
        /// Directory with the test cases.
        #[arg()]
        cases: PathBuf,
        /// A limit for the number of executed instructions in each case.
        /// Defaults to SAFLANG_MAX_OPS.
        #[arg(long, short = 'l')]
        op_limit: Option<u64>,
    },
}

/// Collects the histogram and optionally logs every step.
struct CliTracer {
    histogram: OpHistogram,
    log: Option<LogTracer>,
}

impl Tracer for CliTracer {
    fn instruction(&mut self, ip: usize, op: Op, stacks: &Stacks) {
        self.histogram.instruction(ip, op, stacks);
        if let Some(log) = &mut self.log {
            log.instruction(ip, op, stacks);
        }
    }
}

fn read_program_from_file(file: &Path) -> Result<Program, anyhow::Error> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Cannot read program {}", file.display()))?;
    Ok(parser::parse(&source)?)
}

fn parse_input(text: &str) -> Result<Vec<i64>, anyhow::Error> {
    let mut input = Vec::new();
    for word in text.split_whitespace() {
        input.push(word.parse().with_context(|| format!("Invalid input value `{word}`"))?);
    }
    Ok(input)
}

fn read_input_from_stdin() -> Result<Vec<i64>, anyhow::Error> {
    let mut input: Vec<i64> = Vec::new();
    for line in std::io::stdin().lock().lines() {
        input.extend(parse_input(&line?)?);
    }
    Ok(input)
}

/// Loads `NAME.in` / `NAME.out` pairs, sorted by name.
fn read_cases(dir: &Path) -> Result<Vec<(String, TestCase)>, anyhow::Error> {
    let mut in_files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Cannot read {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "in") {
            in_files.push(path);
        }
    }
    in_files.sort();

    let mut cases = Vec::new();
    for in_file in in_files {
        let out_file = in_file.with_extension("out");
        let input = std::fs::read_to_string(&in_file)
            .with_context(|| format!("Cannot read {}", in_file.display()))?;
        let expected_output = std::fs::read_to_string(&out_file)
            .with_context(|| format!("Missing expected output {}", out_file.display()))?;
        let name = in_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let input = parse_input(&input).with_context(|| format!("In {}", in_file.display()))?;
        debug!(case = %name, input_len = input.len(), "loaded test case");
        cases.push((name, TestCase::new(input, expected_output)));
    }
    Ok(cases)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = HostConfig::from_env()?;

    match args.command {
        Command::Run { file, op_limit, stats } => {
            let program = read_program_from_file(&file)?;
            let input = read_input_from_stdin()?;
            let options = VMOptions::new(&input, op_limit.unwrap_or(config.max_op_count));
            let tracer = CliTracer {
                histogram: OpHistogram::default(),
                log: config.trace_steps.then(LogTracer::default),
            };

            let start_time = std::time::Instant::now();
            let result = vm::run_with_stats(&program, options, tracer)?;
            let elapsed = start_time.elapsed();

            let mut stdout = std::io::stdout().lock();
            stdout.write_all(result.output.as_bytes())?;
            stdout.flush()?;

            if stats {
                print_stats(result.instruction_counter, elapsed, &result.tracer.histogram);
            }
        }
        Command::Judge { file, cases, op_limit } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Cannot read program {}", file.display()))?;
            let cases = read_cases(&cases)?;
            let test_cases: Vec<TestCase> = cases.iter().map(|(_, case)| case.clone()).collect();
            let report = judge::judge(&source, &test_cases, op_limit.unwrap_or(config.max_op_count))?;

            for ((name, _), outcome) in cases.iter().zip(report.outcomes.iter()) {
                match outcome {
                    CaseOutcome::Accepted => println!("{name}: accepted"),
                    CaseOutcome::WrongAnswer { actual } => println!("{name}: wrong answer (printed {actual:?})"),
                    CaseOutcome::RuntimeError(error) => println!("{name}: {error}"),
                }
            }

            if !report.all_accepted() {
                bail!("{} of {} test cases failed", cases.len() - report.accepted_count(), cases.len());
            }
        }
    }

    Ok(())
}

fn print_stats(instruction_counter: u64, elapsed: Duration, histogram: &OpHistogram) {
    let instructions_per_second = instruction_counter as f64 / elapsed.as_secs_f64();
    eprintln!();
    eprintln!("Execution time: {:?}", elapsed);
    eprintln!(
        "Instructions executed: {} ({}/s)",
        instruction_counter,
        match instructions_per_second {
            n if n >= 1_000_000.0 => format!("{:.1}M", n / 1_000_000.0),
            n if n >= 1_000.0 => format!("{:.1}k", n / 1_000.0),
            n => format!("{:.1}", n),
        }
    );
    for (name, count) in &histogram.counts {
        eprintln!("  {name:>10}: {count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("saflang-cli-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            std::fs::write(dir.join(file), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("").unwrap(), Vec::<i64>::new());
        assert_eq!(parse_input(" 1\t-2\n\n 30 ").unwrap(), [1, -2, 30]);
        assert!(parse_input("1 two 3").is_err());
        assert!(parse_input("1.5").is_err());
    }

    #[test]
    fn test_read_cases() {
        let dir = case_dir("pairs", &[
            ("2.in", "7"),
            ("2.out", "7"),
            ("1.in", "5 6\n"),
            ("1.out", "5\n"),
            ("notes.txt", "not a case"),
        ]);
        let cases = read_cases(&dir).unwrap();
        assert_eq!(
            cases,
            [
                ("1".to_string(), TestCase::new(vec![5, 6], "5\n")),
                ("2".to_string(), TestCase::new(vec![7], "7")),
            ]
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_cases_missing_output() {
        let dir = case_dir("missing", &[("1.in", "1"), ("1.out", "1"), ("2.in", "2")]);
        let err = read_cases(&dir).unwrap_err();
        assert!(err.to_string().starts_with("Missing expected output"), "{err}");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_cases_invalid_input() {
        let dir = case_dir("invalid", &[("1.in", "1 x"), ("1.out", "")]);
        assert!(read_cases(&dir).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
