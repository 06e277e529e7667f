use crate::config::{load_usage, Config};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use csspress_restructure::{restructure, RestructureOptions};
use csspress_syntax::{format_error, parse, serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const MINIFIED_SUFFIX: &str = ".min.css";

#[derive(Debug, Args)]
pub struct CompressArgs {
    /// Stylesheet or directory to compress (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: String,

    /// Output to stdout instead of files
    #[arg(long)]
    pub stdout: bool,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Only consolidate at-rules, skip structural passes
    #[arg(long)]
    pub no_restructure: bool,

    /// Group every @media with the same prelude
    #[arg(long)]
    pub force_media_merge: bool,

    /// JSON file with class usage scopes
    #[arg(long)]
    pub usage: Option<String>,
}

/// Size of one stylesheet before and after compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savings {
    pub before: usize,
    pub after: usize,
}

impl Savings {
    pub fn ratio(&self) -> f64 {
        if self.before == 0 {
            return 0.0;
        }
        100.0 * (self.before as f64 - self.after as f64) / self.before as f64
    }
}

pub fn compress(args: CompressArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let options = resolve_options(&config, &args, cwd)?;
    let input = PathBuf::from(cwd).join(&args.path);

    if !input.exists() {
        return Err(anyhow!("Input path does not exist: {}", input.display()));
    }

    let (root, files) = if input.is_file() {
        let root = input.parent().map(Path::to_path_buf).unwrap_or_default();
        (root, vec![input.clone()])
    } else {
        (input.clone(), find_css_files(&input)?)
    };

    if files.is_empty() {
        println!("{}", "⚠️  No .css files found".yellow());
        return Ok(());
    }

    let out_dir = args
        .out_dir
        .as_ref()
        .map(|dir| PathBuf::from(cwd).join(dir))
        .or_else(|| config.get_out_dir(cwd));

    if !args.stdout {
        println!("{}", "🗜  Compressing stylesheets...".bright_blue().bold());
        println!("Found {} files", files.len());
    }

    let mut success_count = 0;
    let mut error_count = 0;
    let mut total = Savings { before: 0, after: 0 };

    for file in &files {
        let relative_path = file.strip_prefix(&root).unwrap_or(file);
        match compress_file(file, &options) {
            Ok((output, savings)) => {
                success_count += 1;
                total.before += savings.before;
                total.after += savings.after;

                if args.stdout {
                    println!("{}", output);
                    continue;
                }

                let output_file = output_path(file, relative_path, out_dir.as_deref());
                if let Some(parent) = output_file.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&output_file, output)?;

                println!(
                    "  {} {} → {} ({} → {} bytes, {:.1}% smaller)",
                    "✓".green(),
                    relative_path.display(),
                    output_file.display(),
                    savings.before,
                    savings.after,
                    savings.ratio()
                );
            }
            Err(e) => {
                error_count += 1;
                eprintln!(
                    "  {} {} - {}",
                    "✗".red(),
                    relative_path.display(),
                    e.to_string().red()
                );
            }
        }
    }

    if args.stdout {
        return if error_count == 0 {
            Ok(())
        } else {
            Err(anyhow!("{} files failed to compress", error_count))
        };
    }

    println!();
    if error_count == 0 {
        println!(
            "{} Compressed {} files, {:.1}% smaller overall",
            "✅".green(),
            success_count,
            total.ratio()
        );
    } else {
        println!(
            "{} Compressed {} files, {} errors",
            "⚠️".yellow(),
            success_count,
            error_count
        );
    }

    Ok(())
}

/// Config file values with command line flags layered on top
fn resolve_options(config: &Config, args: &CompressArgs, cwd: &str) -> Result<RestructureOptions> {
    let mut options = config.restructure_options();
    if args.no_restructure {
        options.restructure = false;
    }
    if args.force_media_merge {
        options.force_media_merge = true;
    }
    if let Some(usage) = &args.usage {
        let path = PathBuf::from(cwd).join(usage);
        options.usage = Some(
            load_usage(&path).map_err(|e| anyhow!("Failed to read usage file {}: {}", path.display(), e))?,
        );
    }
    Ok(options)
}

fn find_css_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_css = path.extension().and_then(|s| s.to_str()) == Some("css");
        let is_minified = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(MINIFIED_SUFFIX))
            .unwrap_or(false);
        if is_css && !is_minified {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn output_path(file: &Path, relative_path: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(out_dir) => out_dir.join(relative_path),
        None => {
            let stem = file
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("output");
            file.with_file_name(format!("{}{}", stem, MINIFIED_SUFFIX))
        }
    }
}

fn compress_file(file_path: &Path, options: &RestructureOptions) -> Result<(String, Savings)> {
    let source = fs::read_to_string(file_path)?;

    let mut tree = parse(&source).map_err(|e| {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        anyhow!("\n{}", format_error(&source, file_name, &e))
    })?;

    let report = restructure(&mut tree, options)?;
    if let Some(last) = report.last() {
        debug!(
            file = %file_path.display(),
            rules = last.rules,
            declarations = last.declarations,
            "Restructured"
        );
    }

    let output = serialize(&tree);
    let savings = Savings {
        before: source.len(),
        after: output.len(),
    };
    Ok((output, savings))
}
