use std::fmt;
use std::path::{Path, PathBuf};

/// Default database location, relative to the working directory.
pub const DEFAULT_DB_URL: &str = "sqlite://tellect.sqlite3";

#[derive(Debug)]
pub struct InvalidDbUrl {
    pub raw: String,
}

impl fmt::Display for InvalidDbUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid --db value: {}", self.raw)
    }
}

impl std::error::Error for InvalidDbUrl {}

fn is_in_memory(url: &str) -> bool {
    url == "sqlite::memory:" || url.contains("mode=memory")
}

/// Turn a path or `sqlite:` URL into an absolute `sqlite://` URL.
///
/// In-memory URLs are returned unchanged. Query parameters are preserved.
pub fn normalize_sqlite_url(raw: &str) -> Result<String, InvalidDbUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidDbUrl { raw: raw.into() });
    }
    if is_in_memory(trimmed) {
        return Ok(trimmed.to_string());
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path_str, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    if path_str.is_empty() {
        return Err(InvalidDbUrl { raw: raw.into() });
    }

    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    Ok(match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}", absolute.display()),
    })
}

/// Create the database file (and parent directories) so the pool can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        log::info!("created database file {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_become_absolute() {
        let url = normalize_sqlite_url(DEFAULT_DB_URL).unwrap();
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("/tellect.sqlite3"));

        let bare = normalize_sqlite_url("data/learn.db").unwrap();
        assert!(bare.ends_with("/data/learn.db"));
    }

    #[test]
    fn absolute_paths_and_queries_are_kept() {
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/t.db?mode=rwc").unwrap(),
            "sqlite:///tmp/t.db?mode=rwc"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:").unwrap(),
            "sqlite::memory:"
        );
    }

    #[test]
    fn blank_urls_are_rejected() {
        assert!(normalize_sqlite_url("  ").is_err());
        assert!(normalize_sqlite_url("sqlite://").is_err());
    }

    #[test]
    fn prepare_creates_missing_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tellect.sqlite3");
        let url = format!("sqlite://{}", path.display());

        prepare_sqlite_file(&url).unwrap();
        assert!(path.exists());
        // second call leaves the file alone
        prepare_sqlite_file(&url).unwrap();
    }
}
