//! Packing a local template set into a zip bundle
//!
//! Bundles let a template set be used offline (`--template-archive`). Every
//! file is stored below a single top-level directory so the same prefix
//! logic reads both bundles and repository snapshots.

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{Cursor, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Zip every file below `template_dir`, stored under `<prefix>/`
pub fn pack_directory(template_dir: &Path, prefix: &str) -> Result<(Vec<u8>, usize)> {
    if !template_dir.is_dir() {
        anyhow::bail!("Template directory not found: {}", template_dir.display());
    }

    let prefix = prefix.trim_matches('/');
    let mut zip_buffer = Vec::new();
    let mut count = 0;
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in WalkDir::new(template_dir)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = entry
                .with_context(|| format!("Failed to walk {}", template_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(template_dir)
                .with_context(|| format!("{} escapes the template dir", entry.path().display()))?;
            let relative: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let zip_path = if prefix.is_empty() {
                relative.join("/")
            } else {
                format!("{}/{}", prefix, relative.join("/"))
            };

            let content = std::fs::read(entry.path())
                .with_context(|| format!("Failed to read {}", entry.path().display()))?;
            zip.start_file(zip_path.as_str(), options)?;
            zip.write_all(&content)?;
            count += 1;
        }

        zip.finish()?;
    }

    Ok((zip_buffer, count))
}

/// Write a bundle of `template_dir` to `output` and report what was packed
pub async fn build_bundle(template_dir: &Path, output: &Path, prefix: &str) -> Result<usize> {
    println!(
        "{}",
        format!("Bundling templates from {}...", template_dir.display())
            .cyan()
            .bold()
    );

    let (zip_bytes, count) = pack_directory(template_dir, prefix)?;
    if count == 0 {
        eprintln!(
            "{} No template files found in {}",
            "Warning:".yellow(),
            template_dir.display()
        );
    }

    tokio::fs::write(output, &zip_bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} {} file(s) into {} ({} bytes)",
        "Bundled".green().bold(),
        count,
        output.display(),
        zip_bytes.len()
    );

    Ok(count)
}
