use crate::agent::StepError;

/// Write `content` to `path`, creating parent directories as needed.
pub fn write_file(path: &std::path::Path, content: &str) -> Result<(), StepError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::write(path, content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch/pkg/outputs.py");
        write_file(&path, "x: int = 1\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x: int = 1\n");
    }
}
