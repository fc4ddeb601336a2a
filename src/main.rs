//! Main entry point for the rasar CLI application.
//!
//! This binary provides a command-line interface for listing, extracting
//! and patching files inside asar archives.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{Read, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use rasar::cli::Command;
use rasar::{ArchiveOptions, Cli, Entry};

/// Application entry point.
///
/// Parses command-line arguments, installs the log subscriber and
/// dispatches to the handler for the chosen subcommand.
fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::List { archive, verbose } => list_files(archive, *verbose),
        Command::Extract {
            archive,
            path,
            output,
        } => extract_file(archive, path, output.as_deref()),
        Command::Patch {
            archive,
            path,
            source,
        } => patch_file(archive, path, source, &cli),
        Command::Info { archive } => show_info(archive),
    }
}

/// List files in the archive.
///
/// Supports two output formats:
/// - Simple format: one path per line, directories ending in `/`
/// - Verbose format (`-v`): size, offset and flags before each path
fn list_files(archive_path: &Path, verbose: bool) -> Result<()> {
    let archive = ArchiveOptions::new()
        .writable(false)
        .open(archive_path)
        .with_context(|| format!("Failed to open {}", archive_path.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if !verbose {
        for path in archive.list() {
            writeln!(out, "{}", path)?;
        }
        return Ok(());
    }

    // Print table header for verbose output
    writeln!(out, "{:>10}  {:>10}  {:<5}  Name", "Size", "Offset", "Flags")?;
    writeln!(out, "{}", "-".repeat(50))?;

    let mut total_size = 0u64;
    let mut file_count = 0usize;

    for (path, entry) in archive.walk() {
        match entry {
            Entry::Directory(_) => {
                writeln!(out, "{:>10}  {:>10}  {:<5}  {}/", "", "", "d", path)?;
            }
            Entry::Link(link) => {
                writeln!(out, "{:>10}  {:>10}  {:<5}  {} -> {}", "", "", "l", path, link.link)?;
            }
            Entry::File(file) => {
                let size = file.declared_size();
                let flags = format!(
                    "{}{}",
                    if file.executable { "x" } else { "-" },
                    if file.unpacked { "u" } else { "-" }
                );
                writeln!(
                    out,
                    "{:>10}  {:>10}  {:<5}  {}",
                    size.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string()),
                    file.raw_offset().unwrap_or("-"),
                    flags,
                    path
                )?;
                total_size += size.unwrap_or(0);
                file_count += 1;
            }
        }
    }

    // Print summary line
    writeln!(out, "{}", "-".repeat(50))?;
    writeln!(out, "{:>10}  {:>10}  {:<5}  {} files", total_size, "", "", file_count)?;

    Ok(())
}

/// Extract a single file to `output`, or to stdout when no output is given.
fn extract_file(archive_path: &Path, path: &str, output: Option<&Path>) -> Result<()> {
    let data = rasar::read_file(archive_path, path)
        .with_context(|| format!("Failed to extract '{}' from {}", path, archive_path.display()))?;

    match output {
        Some(output) => {
            std::fs::write(output, &data)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Overwrite a file inside the archive with the content of `source`.
///
/// `source` is a path on disk, or `-` to read the content from stdin.
fn patch_file(archive_path: &Path, path: &str, source: &str, cli: &Cli) -> Result<()> {
    let content = if source == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(source).with_context(|| format!("Failed to read {}", source))?
    };

    rasar::write_file(archive_path, path, &content)
        .with_context(|| format!("Failed to patch '{}' in {}", path, archive_path.display()))?;

    if !cli.is_quiet() {
        println!("  patched: {} ({})", path, format_size(content.len() as u64));
    }

    Ok(())
}

/// Print header fields and a summary of the directory tree.
fn show_info(archive_path: &Path) -> Result<()> {
    let archive = ArchiveOptions::new()
        .writable(false)
        .open(archive_path)
        .with_context(|| format!("Failed to open {}", archive_path.display()))?;

    let header = archive.header();
    println!("Data size:          {}", header.data_size);
    println!("Header size:        {}", header.header_size);
    println!("Header object size: {}", header.header_object_size);
    println!("Header string size: {}", header.header_string_size);
    println!("Base offset:        {}", archive.base_offset());

    let (mut files, mut dirs, mut links, mut packed) = (0usize, 0usize, 0usize, 0u64);
    for (_, entry) in archive.walk() {
        match entry {
            Entry::Directory(_) => dirs += 1,
            Entry::Link(_) => links += 1,
            Entry::File(file) => {
                files += 1;
                if !file.unpacked {
                    packed += file.declared_size().unwrap_or(0);
                }
            }
        }
    }

    println!("Files:              {}", files);
    println!("Directories:        {}", dirs);
    println!("Links:              {}", links);
    println!("Packed data:        {}", format_size(packed));

    Ok(())
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
