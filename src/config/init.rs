use anyhow::{bail, Context, Result};
use atomic_write_file::AtomicWriteFile;
use std::io::Write;
use std::path::Path;
use tracing::info;

use super::{ensure_parent_dir, Config};

const HEADER: &str = "\
# gpa-planner catalog
# Each course lists the subjects every student takes. Electives add subjects on top.
# credits weight a subject's score in the average; scores run from 0 to max_score.
";

/// Write the default catalog to `path` atomically.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite",
            path.display()
        );
    }

    ensure_parent_dir(path)?;

    let yaml = serde_saphyr::to_string(&Config::default())
        .context("Failed to serialize default config")?;

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
    write!(file, "{}{}", HEADER, yaml)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    file.commit().context("Failed to save config")?;

    info!(path = %path.display(), "wrote default config");
    Ok(())
}
