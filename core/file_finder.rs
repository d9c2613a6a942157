use crate::rule::ConversionRule;
use anyhow::{Context, Result};
use clap::builder::TypedValueParser;
use clap::{Parser, Subcommand};
use ignore::overrides::{Override, OverrideBuilder};
use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

pub const MAX_RECURSION_DEPTH: usize = 24;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    about = "Normalize indentation and line endings in place (main arguments)",
    long_about = "These are the main arguments for whitespace conversion."
)]
pub struct TabspaceArgs {
    #[clap(
        value_name = "PATTERN",
        help = "File name glob, matched in the current directory and its subdirectories [multiple allowed]",
        required = true
    )]
    pub patterns: Vec<String>,

    #[clap(
        short = 's',
        long = "spaces",
        help = "Use the aligned all-space rule instead of the tab-space rule"
    )]
    pub spaces: bool,

    #[clap(
        long,
        value_name = "N",
        default_value_t = MAX_RECURSION_DEPTH,
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from),
        help = "Number of directory levels to visit, counting the current one"
    )]
    pub max_depth: usize,

    #[clap(short = 'y', long = "yes", help = "Skip the confirmation prompt")]
    pub no_confirm: bool,

    #[clap(short, long, help = "Log every step of each conversion")]
    pub verbose: bool,
}

impl TabspaceArgs {
    pub fn rule(&self) -> ConversionRule {
        if self.spaces {
            ConversionRule::AlignedSpace
        } else {
            ConversionRule::TabIndent
        }
    }
}

impl Default for TabspaceArgs {
    fn default() -> Self {
        TabspaceArgs {
            patterns: Vec::new(),
            spaces: false,
            max_depth: MAX_RECURSION_DEPTH,
            no_confirm: false,
            verbose: false,
        }
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    #[clap(about = "Generate shell completion scripts")]
    Completion(CompletionArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct CompletionArgs {
    #[clap(value_parser = clap::value_parser!(clap_complete::Shell))]
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    name = "tabspace",
    version = "0.1.0",
    about = "Tab-space code beautifier",
    long_about = "Rewrites matching files so indentation follows the tab-space (or aligned all-space) rule,\nline endings are single LFs and no line carries trailing whitespace.\nChanged files keep their previous contents under a .bak name.",
    propagate_version = true,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Option<Command>,

    #[clap(flatten)]
    pub main_opts: TabspaceArgs,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Illegal pattern {0}, as it contains / or \\")]
    ContainsSeparator(String),

    #[error("Tabspace refuses to do this pattern: {0}")]
    Refused(String),

    #[error("Tabspace refuses negated pattern {0}, as it would match nothing")]
    Negated(String),

    #[error("Invalid pattern {pattern}: {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Empty pattern")]
    Empty,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum GuardError {
    #[error("Tabspace refuses to work in a root or first-level directory: {}", .0.display())]
    ShallowDirectory(PathBuf),
}

pub fn check_pattern(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }
    if pattern.contains(['/', '\\']) {
        return Err(PatternError::ContainsSeparator(pattern.to_string()));
    }
    if pattern == "*" || pattern.contains(".*") {
        return Err(PatternError::Refused(pattern.to_string()));
    }
    if pattern.starts_with('!') {
        return Err(PatternError::Negated(pattern.to_string()));
    }
    build_matcher(Path::new("."), pattern)
        .map(drop)
        .map_err(|e| PatternError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.root_cause().to_string(),
        })
}

pub fn check_working_dir(dir: &Path) -> Result<(), GuardError> {
    let depth = dir
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    if depth <= 1 {
        return Err(GuardError::ShallowDirectory(dir.to_path_buf()));
    }
    Ok(())
}

fn build_matcher(root: &Path, pattern: &str) -> Result<Override> {
    let mut o = OverrideBuilder::new(root);
    o.add(pattern)
        .with_context(|| format!("Pattern: {}", pattern))?;
    o.build().context("Overrides")
}

// Regular files ahead of subdirectories, each group by name.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_match(e: &DirEntry, matcher: &Override) -> bool {
    let name = Path::new(e.file_name());
    if e.file_type().is_symlink() {
        if matcher.matched(name, false).is_whitelist() {
            debug!(path = %e.path().display(), "skipping symbolic link");
        }
        return false;
    }
    if !e.file_type().is_file() {
        return false;
    }
    matcher.matched(name, false).is_whitelist()
}

/// Collects the regular files under `root` whose name matches `pattern`.
///
/// Files directly in `root` are level 0; the walk descends at most
/// `max_depth - 1` levels below it. Symlinks are not followed. Unreadable
/// subdirectories are logged and skipped, an unreadable `root` is an error.
pub fn find_matches(root: &Path, pattern: &str, max_depth: usize) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        anyhow::bail!("Directory not found: {}", root.display());
    }
    let matcher = build_matcher(root, pattern)?;
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by(files_first);

    let mut f = Vec::new();
    for i in walker {
        match i {
            Ok(e) => {
                if e.file_type().is_dir() && e.depth() == max_depth {
                    warn!(
                        dir = %e.path().display(),
                        "Maximum recursion depth {} is reached, not processing subdirectory",
                        max_depth
                    );
                    continue;
                }
                if is_match(&e, &matcher) {
                    f.push(e.into_path());
                }
            }
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("Reading {}", root.display()));
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
            }
        }
    }
    debug!(pattern, count = f.len(), "enumerated matching files");
    Ok(f)
}
