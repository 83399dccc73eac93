use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use rand::Rng;

use super::error::{Error, Result};

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 4;
const MAX_ATTEMPTS: usize = 16;

/// `{YYYYMMDD}_{XXXX}.txt` for today, with a fresh random suffix.
pub fn artifact_name() -> String {
    let date = chrono::Local::now().format("%Y%m%d");
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{date}_{suffix}.txt")
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the trimmed text to a new file and returns its path.
    /// The caller is expected to reject empty text first.
    pub fn persist(&self, text: &str) -> Result<PathBuf> {
        self.persist_with(text, artifact_name)
    }

    pub(crate) fn persist_with(
        &self,
        text: &str,
        mut next_name: impl FnMut() -> String,
    ) -> Result<PathBuf> {
        let mut last_path = self.dir.clone();
        for _ in 0..MAX_ATTEMPTS {
            let path = self.dir.join(next_name());
            let file = OpenOptions::new().write(true).create_new(true).open(&path);
            let file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    log::debug!("{} exists, picking another name", path.display());
                    last_path = path;
                    continue;
                }
                Err(e) => return Err(Error::io(path, e)),
            };

            fill(&path, file, text.trim().as_bytes())?;
            log::info!("story saved to {}", path.display());
            return Ok(path);
        }

        Err(Error::io(
            last_path,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("no free file name after {MAX_ATTEMPTS} attempts"),
            ),
        ))
    }
}

/// Writes into a freshly created file. On failure the partial file is
/// removed so no half-written story is left behind.
fn fill(path: &Path, mut file: impl Write, bytes: &[u8]) -> Result<()> {
    if let Err(e) = file.write_all(bytes).and_then(|_| file.flush()) {
        drop(file);
        if let Err(rm) = std::fs::remove_file(path) {
            log::warn!("could not remove partial {}: {rm}", path.display());
        }
        return Err(Error::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = OutputWriter::new(dir.path()).persist("hello").unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        let pattern = regex::Regex::new(r"^\d{8}_[A-Z0-9]{4}\.txt$").unwrap();
        assert!(pattern.is_match(name), "{name}");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn persist_trims_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = OutputWriter::new(dir.path())
            .persist("\n  秋天的小院。\n\n")
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "秋天的小院。");
    }

    #[test]
    fn existing_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let taken = dir.path().join("20260101_AAAA.txt");
        std::fs::write(&taken, "earlier story").unwrap();

        let mut names = ["20260101_AAAA.txt", "20260101_BBBB.txt"].into_iter();
        let path = OutputWriter::new(dir.path())
            .persist_with("new story", || names.next().unwrap().to_string())
            .unwrap();

        assert_eq!(path, dir.path().join("20260101_BBBB.txt"));
        assert_eq!(std::fs::read_to_string(taken).unwrap(), "earlier story");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "new story");
    }

    #[test]
    fn gives_up_when_every_name_is_taken() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("20260101_AAAA.txt"), "x").unwrap();

        let err = OutputWriter::new(dir.path())
            .persist_with("y", || "20260101_AAAA.txt".to_string())
            .unwrap_err();
        match err {
            Error::Io { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20260101_CCCC.txt");
        std::fs::write(&path, "").unwrap();

        let err = fill(&path, FullDisk, b"story").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OutputWriter::new(dir.path().join("nope"))
            .persist("hello")
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
