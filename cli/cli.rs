use tabspace_core::{
    CliArgs, Command as CoreCommand, ConversionRule, ConvertError, CoreError, FileOutcome,
    PatternError, check_pattern, convert_file, find_matches, working_dir,
};
mod interaction;
mod logging;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use console::style;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn print_completions_cli(shell: clap_complete::Shell) {
    let mut cmd = CliArgs::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}

fn print_banner() {
    println!(
        "{} {}",
        style("Tabspace Code Beautifier").bold(),
        env!("CARGO_PKG_VERSION")
    );
}

fn display_path(path: &Path) -> String {
    path.strip_prefix(".").unwrap_or(path).display().to_string()
}

#[derive(Debug, Default)]
struct Tally {
    converted: usize,
    unchanged: usize,
    skipped: usize,
    failed: usize,
}

fn report(
    path: &Path,
    rule: ConversionRule,
    result: Result<FileOutcome, ConvertError>,
    tally: &mut Tally,
) {
    let shown = display_path(path);
    match result {
        Ok(FileOutcome::Converted { .. }) => {
            tally.converted += 1;
            println!(
                "{} : {}",
                shown,
                style(format!("{} conversion successful", rule)).green()
            );
        }
        Ok(FileOutcome::Unchanged) => {
            tally.unchanged += 1;
            println!(
                "{} : {}",
                shown,
                style(format!("already {} compliant so left unchanged", rule)).dim()
            );
        }
        Ok(FileOutcome::SkippedBackup) => {
            tally.skipped += 1;
            println!(
                "{} : {}",
                shown,
                style("not processed as its extension is .bak").dim()
            );
        }
        Err(err) => {
            tally.failed += 1;
            eprintln!(
                "{} {} : {}",
                style("⚠️").yellow(),
                shown,
                style(err).red()
            );
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "file" } else { "files" }
}

fn main() -> Result<ExitCode> {
    let cli: CliArgs = CliArgs::parse();

    if let Some(command_enum_val) = cli.command {
        match command_enum_val {
            CoreCommand::Completion(args) => {
                print_completions_cli(args.shell);
                return Ok(ExitCode::SUCCESS);
            }
        }
    }

    let main_app_args = cli.main_opts;

    if let Err(e) = logging::init(main_app_args.verbose) {
        eprintln!("{}", style(format!("Logging setup failed: {}", e)).yellow());
    }

    print_banner();

    let rejected: Vec<PatternError> = main_app_args
        .patterns
        .iter()
        .filter_map(|p| check_pattern(p).err())
        .collect();
    if let Some(first) = rejected.first() {
        for e in &rejected {
            eprintln!("{}", style(e).red());
        }
        return Ok(ExitCode::from(CoreError::from(first.clone()).exit_code()));
    }

    let curr_dir = match working_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{}", style(&e).red());
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    let mut batches: Vec<(&str, Vec<PathBuf>)> = Vec::new();
    for pattern in &main_app_args.patterns {
        match find_matches(Path::new("."), pattern, main_app_args.max_depth) {
            Ok(files) => batches.push((pattern.as_str(), files)),
            Err(e) => {
                eprintln!("{}", style(format!("Error finding files: {:#}", e)).red());
                return Ok(ExitCode::from(CoreError::from(e).exit_code()));
            }
        }
    }

    let total: usize = batches.iter().map(|(_, files)| files.len()).sum();
    if total == 0 {
        println!("No files found matching the patterns.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Found {} {}:", total, plural(total));
    for file in batches.iter().flat_map(|(_, files)| files).take(10) {
        println!("  {}", style(display_path(file)).dim());
    }
    if total > 10 {
        println!("  ... and {} more.", total - 10);
    }

    let rule = main_app_args.rule();
    match interaction::confirm_processing(total, rule, main_app_args.no_confirm) {
        Ok(true) => {}
        Ok(false) => return Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("Error during confirmation: {}", e)).red()
            );
            return Ok(ExitCode::FAILURE);
        }
    }

    let mut tally = Tally::default();
    for (pattern, files) in batches {
        println!(
            "\nTabspace (using {} rule) beautifying {} files in {}",
            rule,
            pattern,
            curr_dir.display()
        );
        tracing::debug!(pattern, count = files.len(), "converting matched files");
        for file in files {
            let result = convert_file(&file, rule);
            report(&file, rule, result, &mut tally);
        }
    }

    println!(
        "\nResult: {} converted, {} unchanged, {} skipped, {} {} failed.",
        style(tally.converted).green(),
        style(tally.unchanged).dim(),
        style(tally.skipped).dim(),
        style(tally.failed).red(),
        plural(tally.failed)
    );

    Ok(ExitCode::SUCCESS)
}
