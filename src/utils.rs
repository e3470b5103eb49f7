use std::io;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "weather_ingest";

/// `<user data dir>/weather_ingest/<name>.db`, if the platform has a data dir.
pub fn default_database_path(name: &str) -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(DATA_DIR_NAME).join(format!("{name}.db")))
}

/// Creates the directory that will hold `path`, if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            if parent.exists() && !parent.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists but is not a directory", parent.display()),
                ));
            }
            std::fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_parents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let db = dir.path().join("a").join("b").join("weather.db");

        ensure_parent_dir(&db)?;
        assert!(dir.path().join("a").join("b").is_dir());

        // Bare file names have no parent to create.
        ensure_parent_dir(Path::new("weather.db"))?;
        Ok(())
    }

    #[test]
    fn database_file_is_named_after_the_database() {
        if let Some(path) = default_database_path("weather_data") {
            assert!(path.ends_with("weather_ingest/weather_data.db"));
        }
    }

    #[test]
    fn refuses_a_file_in_the_way() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("blocker"), b"")?;

        let result = ensure_parent_dir(&dir.path().join("blocker").join("weather.db"));
        assert!(result.is_err());
        Ok(())
    }
}
