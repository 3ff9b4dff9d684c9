use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;

pub trait PathBufExt {
    fn open(&self, allow_overwrite: bool) -> anyhow::Result<BufWriter<File>>;
}

impl PathBufExt for PathBuf {
    fn open(&self, allow_overwrite: bool) -> anyhow::Result<BufWriter<File>> {
        let mut file_options = File::options();

        if allow_overwrite {
            file_options.write(true).truncate(true).create(true);
        } else {
            file_options.write(true).create_new(true);
        };

        let file = file_options
            .open(self)
            .context(format!("failed to create file: {}", self.to_string_lossy()))?;

        Ok(BufWriter::new(file))
    }
}

/// A file when a path is given, stdout otherwise.
pub fn writer_for(
    path: Option<&PathBuf>,
    allow_overwrite: bool,
) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(path.open(allow_overwrite)?)),
        None => Ok(Box::new(BufWriter::new(std::io::stdout().lock()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[test]
    fn test_open_respects_overwrite() {
        let path = std::env::temp_dir().join(format!("cirrus-open-{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let_assert!(Ok(mut out) = path.open(false));
        check!(writeln!(out, "first").is_ok());
        drop(out);

        check!(path.open(false).is_err());
        check!(path.open(true).is_ok());

        let _ = std::fs::remove_file(&path);
    }
}
