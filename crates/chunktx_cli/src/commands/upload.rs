//! Upload command implementation.

use chunktx_core::{upload, Config, Outcome, UploadHeader};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Upload result.
#[derive(Debug, Serialize)]
pub struct UploadResult {
    /// Local source file.
    pub source: String,
    /// Published path.
    pub destination: String,
    /// Bytes uploaded.
    pub size: u64,
    /// Payloads sent.
    pub chunks: u64,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u64,
}

/// Runs the upload command.
pub fn run(
    source: &Path,
    dest: Option<PathBuf>,
    config: &Config,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let header = match dest {
        Some(dest) => UploadHeader::from_file_as(source, dest)?,
        None => UploadHeader::from_file(source)?,
    };
    let destination = config.storage_root.join(header.destination()?);

    debug!(%header, chunk_size = config.chunk_size, serial = config.serial, "starting upload");
    let processor = upload::file_processor(config)?;
    let started = Instant::now();
    let report = upload::upload(&processor, &header, config.chunk_size)?;

    let result = UploadResult {
        source: source.display().to_string(),
        destination: destination.display().to_string(),
        size: header.size(),
        chunks: report.chunks,
        outcome: report.outcome,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    if result.outcome == Outcome::Commit {
        Ok(())
    } else {
        Err(format!("upload ended with {}", result.outcome).into())
    }
}

fn print_text_output(result: &UploadResult) {
    println!("chunktx Upload");
    println!("==============");
    println!();
    println!("Source:      {}", result.source);
    println!("Destination: {}", result.destination);
    println!("Size:        {}", format_bytes(result.size));
    println!("Chunks:      {}", result.chunks);
    println!("Outcome:     {}", result.outcome);
    println!("Elapsed:     {} ms", result.elapsed_ms);
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes() {
        assert_eq!(format_bytes(12), "12 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
