use std::collections::HashSet;
use std::io::{Cursor, Write};

use anyhow::Result;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::deck::safe_filename;
use crate::proxies::fetch::FetchOutcome;

/// Packs the downloaded images into a ZIP:
/// `fronts/<name><suffix>.<ext>`, `backs/<name><suffix>.<ext>` and `_report.json`.
///
/// The same card on several deck lines would produce the same name twice,
/// which the zip writer rejects; later copies are numbered `" (2)"`, `" (3)"`...
pub fn build_archive(outcome: &FetchOutcome) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut used = HashSet::new();

    for (entry, images) in outcome.successes() {
        let stem = unique_stem(
            &mut used,
            format!("{}{}", safe_filename(&entry.name), entry.suffix),
        );

        zip.start_file(format!("fronts/{stem}.{}", images.front_ext), options)?;
        zip.write_all(&images.front)?;

        if let Some(back) = &images.back {
            zip.start_file(format!("backs/{stem}.{}", images.back_ext), options)?;
            zip.write_all(back)?;
        }
    }

    zip.start_file("_report.json", options)?;
    zip.write_all(serde_json::to_string_pretty(&outcome.report)?.as_bytes())?;

    Ok(zip.finish()?.into_inner())
}

fn unique_stem(used: &mut HashSet<String>, stem: String) -> String {
    if used.insert(stem.clone()) {
        return stem;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{stem} ({n})");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
