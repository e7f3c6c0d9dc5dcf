use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Fail when the diff destination `output` is one of the config files being
/// compared.
pub fn ensure_output_not_input(output: &Path, inputs: &[&Path]) -> Result<()> {
    let destination = resolve(output)
        .with_context(|| format!("failed to resolve output path {}", output.display()))?;

    for input in inputs {
        let source = resolve(input)
            .with_context(|| format!("failed to resolve input path {}", input.display()))?;
        if destination == source {
            bail!(
                "refusing to overwrite input config: output {} is {}",
                output.display(),
                input.display()
            );
        }
    }
    Ok(())
}

/// Canonical form of `path`. A file that does not exist yet resolves
/// through its parent directory, so `dir/../current.cfg` still compares
/// equal to `current.cfg`.
fn resolve(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return path
            .canonicalize()
            .with_context(|| format!("canonicalize {}", path.display()));
    }

    let Some(name) = path.file_name() else {
        bail!("{} does not name a file", path.display());
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let parent = if parent.exists() {
        parent
            .canonicalize()
            .with_context(|| format!("canonicalize {}", parent.display()))?
    } else {
        std::env::current_dir().context("current_dir")?.join(parent)
    };
    Ok(parent.join(name))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::ensure_output_not_input;

    #[test]
    fn dotted_output_path_still_matches_input() {
        let dir = tempdir().expect("tempdir");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).expect("subdir");
        let current = dir.path().join("current.cfg");
        fs::write(&current, "hostname r1\n").expect("current write");

        let dotted = sub.join("..").join("current.cfg");
        let err = ensure_output_not_input(&dotted, &[&current]).expect_err("same file");
        assert!(err.to_string().contains("refusing to overwrite input config"));
    }

    #[test]
    fn new_file_beside_inputs_is_allowed() {
        let dir = tempdir().expect("tempdir");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).expect("subdir");
        let current = dir.path().join("current.cfg");
        fs::write(&current, "hostname r1\n").expect("current write");

        let patch = sub.join("..").join("patch.txt");
        assert!(ensure_output_not_input(&patch, &[&current]).is_ok());
    }

    #[test]
    fn input_that_does_not_exist_yet_resolves_the_same_way() {
        let dir = tempdir().expect("tempdir");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).expect("subdir");
        let planned = dir.path().join("planned.cfg");
        let dotted = sub.join("..").join("planned.cfg");
        assert!(ensure_output_not_input(&dotted, &[&planned]).is_err());
    }
}
