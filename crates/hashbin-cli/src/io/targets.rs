use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use walkdir::WalkDir;

use hashbin_core::model::ArtifactRecord;

/// Length and sha256 of a file on disk.
pub fn digest_file(path: &Path) -> Result<ArtifactRecord> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(ArtifactRecord::from_bytes(&bytes))
}

/// Target path of `file` relative to `root`, with `/` separators.
pub fn target_path(root: &Path, file: &Path) -> Result<String> {
    let rel = file
        .strip_prefix(root)
        .map_err(|_| anyhow!("{} is outside {}", file.display(), root.display()))?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("non utf-8 path: {}", rel.display()))
        })
        .collect::<Result<_>>()?;
    if parts.is_empty() {
        return Err(anyhow!("empty target path for {}", file.display()));
    }
    Ok(parts.join("/"))
}

/// Every regular file under `root` as `(target path, record)`, sorted by path.
pub fn collect_targets(root: &Path) -> Result<Vec<(String, ArtifactRecord)>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = target_path(root, entry.path())?;
        out.push((path, digest_file(entry.path())?));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}
