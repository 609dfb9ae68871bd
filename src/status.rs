// Checkpoint status display: what an interrupted exposure run left behind.

use std::path::Path;

use anyhow::Result;

use crate::exposure::checkpoint::{idf_path, Checkpoint};

/// Display checkpoint status to the terminal.
pub fn show(checkpoint_path: &Path) -> Result<()> {
    let Some(cp) = Checkpoint::load(checkpoint_path)? else {
        println!("Checkpoint: none at {}", checkpoint_path.display());
        println!("\nThe next `callscore exposure` run will start from the first batch.");
        return Ok(());
    };

    let file_size = std::fs::metadata(checkpoint_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Checkpoint: {} ({})", checkpoint_path.display(), file_size);

    match cp.method {
        Some(method) => println!("Method: {method}"),
        None => println!("Method: not recorded"),
    }

    println!("Completed batches: {}", cp.batch_number);
    match cp.total_files {
        Some(total) => println!("Exposures saved: {} of {} transcripts", cp.exposures.len(), total),
        None => println!("Exposures saved: {}", cp.exposures.len()),
    }

    if let Some(saved_at) = cp.saved_at {
        println!("Last saved: {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    let idf = idf_path(checkpoint_path);
    if idf.exists() {
        println!("IDF table: {}", idf.display());
    } else {
        println!("IDF table: none");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
