//! Main entry point for the zipvfs CLI application.
//!
//! Indexes one archive, then lists, tests, pipes or extracts its entries.
//! Stream work is blocking, so every entry is handled on tokio's blocking
//! pool with a stream (and file handle) of its own.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::{SeekFrom, Write};
use std::sync::Arc;
use tokio::task::{JoinSet, spawn_blocking};
use tracing_subscriber::EnvFilter;

use zipvfs::{ArchiveIndex, Cli, Directory, EntryStream, ZipExtractor};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let path = cli.file.clone();
    let index = spawn_blocking(move || ArchiveIndex::open(path))
        .await?
        .with_context(|| format!("cannot index {}", cli.file))?;
    let index = Arc::new(index);

    if cli.list || (cli.verbose && !cli.test) {
        return list_files(&index, &cli);
    }

    let selected = select_entries(&index, &cli);
    if selected.is_empty() {
        bail!("no matching entries in {}", cli.file);
    }

    if cli.test {
        test_entries(index, selected, &cli).await
    } else if cli.pipe {
        let offset = cli.offset;
        spawn_blocking(move || pipe_entries(&index, &selected, offset)).await?
    } else {
        extract_entries(index, selected, &cli).await
    }
}

/// Install the stderr log subscriber; `RUST_LOG` wins over the flags.
fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the requested paths to raw full entry paths.
///
/// A path naming a file selects it; a path naming a directory selects
/// every file below it. No paths selects the whole archive.
fn select_entries(index: &ArchiveIndex, cli: &Cli) -> Vec<Vec<u8>> {
    let all = index.entries();
    if cli.paths.is_empty() {
        return all.into_iter().map(|(path, _)| path).collect();
    }

    let mut selected = Vec::new();
    for requested in &cli.paths {
        let trimmed = requested.trim_start_matches('/');
        if index.find_entry(trimmed).is_some() {
            selected.push(trimmed.as_bytes().to_vec());
        } else if index.find_directory(trimmed).is_some() {
            let prefix = format!("{}/", trimmed.trim_end_matches('/'));
            let below = all.iter().filter(|(path, _)| {
                prefix == "/"
                    || path
                        .get(..prefix.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
            });
            selected.extend(below.map(|(path, _)| path.clone()));
        } else if !cli.is_very_quiet() {
            eprintln!("caution: filename not matched:  {requested}");
        }
    }
    selected
}

/// Print the directory tree, or a size table in verbose mode.
fn list_files(index: &ArchiveIndex, cli: &Cli) -> Result<()> {
    let roots: Vec<(&str, &Directory)> = if cli.paths.is_empty() {
        vec![("", index.root())]
    } else {
        cli.paths
            .iter()
            .map(|p| {
                index
                    .find_directory(p)
                    .map(|d| (p.as_str(), d))
                    .with_context(|| format!("directory not found: {p}"))
            })
            .collect::<Result<_>>()?
    };

    if cli.verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    let mut totals = Totals::default();
    for (label, dir) in roots {
        if !label.is_empty() {
            println!("{label}:");
        }
        print_tree(dir, 0, cli.verbose, &mut totals);
    }

    if cli.verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files ({})",
            totals.uncompressed,
            totals.compressed,
            ratio(totals.compressed, totals.uncompressed),
            "",
            totals.files,
            format_size(totals.uncompressed)
        );
    }

    Ok(())
}

#[derive(Default)]
struct Totals {
    uncompressed: u64,
    compressed: u64,
    files: usize,
}

fn print_tree(dir: &Directory, depth: usize, verbose: bool, totals: &mut Totals) {
    let indent = "  ".repeat(depth);

    for sub in dir.subdirectories() {
        if verbose {
            println!("{:>50}{indent}{}/", "", sub.name());
        } else {
            println!("{indent}{}/", sub.name());
        }
        print_tree(sub, depth + 1, verbose, totals);
    }

    for file in dir.files() {
        if verbose {
            let (year, month, day) = file.mod_date();
            let (hour, minute, _second) = file.mod_time();
            println!(
                "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {indent}{}",
                file.uncompressed_size,
                file.compressed_size,
                ratio(file.compressed_size, file.uncompressed_size),
                year,
                month,
                day,
                hour,
                minute,
                file.name()
            );
        } else {
            println!("{indent}{}", file.name());
        }
        totals.uncompressed += file.uncompressed_size;
        totals.compressed += file.compressed_size;
        totals.files += 1;
    }
}

/// Compression ratio as percentage saved.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Decompress every selected entry concurrently and check its CRC-32.
async fn test_entries(
    index: Arc<ArchiveIndex>,
    selected: Vec<Vec<u8>>,
    cli: &Cli,
) -> Result<()> {
    let mut tasks = JoinSet::new();
    for path in selected {
        let index = Arc::clone(&index);
        tasks.spawn_blocking(move || {
            let result = ZipExtractor::new(&index).verify(&path);
            (String::from_utf8_lossy(&path).into_owned(), result)
        });
    }

    let mut failed = 0usize;
    let mut passed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (path, result) = joined?;
        match result {
            Ok(()) => {
                passed += 1;
                if !cli.is_quiet() {
                    println!("    testing: {path:<40} OK");
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("    testing: {path:<40} FAILED ({e})");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} entries failed", failed + passed);
    }
    if !cli.is_very_quiet() {
        println!("No errors detected in {} ({passed} files)", cli.file);
    }
    Ok(())
}

/// Write the selected entries to stdout, each starting at `offset`.
fn pipe_entries(index: &ArchiveIndex, selected: &[Vec<u8>], offset: u64) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for raw in selected {
        let path = String::from_utf8_lossy(raw);
        if selected.len() > 1 {
            writeln!(out, "--- {path} ---")?;
        }
        let mut stream = EntryStream::open(index, raw)?;
        if offset > 0 {
            stream
                .seek(SeekFrom::Start(offset))
                .with_context(|| format!("cannot seek {path} to {offset}"))?;
        }
        std::io::copy(&mut stream, &mut out)?;
        stream.close();
    }

    out.flush()?;
    Ok(())
}

/// Extract the selected entries to disk, one blocking task per entry.
async fn extract_entries(
    index: Arc<ArchiveIndex>,
    selected: Vec<Vec<u8>>,
    cli: &Cli,
) -> Result<()> {
    let mut tasks = JoinSet::new();

    for raw in selected {
        let path = String::from_utf8_lossy(&raw).into_owned();
        let Some(output_path) = cli.output_path(&raw) else {
            if !cli.is_very_quiet() {
                eprintln!("Skipping: {path} (outside the extraction directory)");
            }
            continue;
        };

        // Handle existing files based on overwrite options
        if output_path.exists() && !cli.overwrite {
            if !cli.is_quiet() {
                if cli.never_overwrite {
                    eprintln!("Skipping: {path} (file exists)");
                } else {
                    eprintln!("Skipping: {path} (use -o to overwrite)");
                }
            }
            continue;
        }

        if !cli.is_quiet() {
            println!("  extracting: {path}");
        }

        let index = Arc::clone(&index);
        tasks.spawn_blocking(move || {
            ZipExtractor::new(&index)
                .extract_to_file(&raw, &output_path)
                .with_context(|| format!("cannot extract {path}"))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        joined??;
    }
    Ok(())
}

/// Format a byte size into a human-readable string.
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
