use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Where the lines to parse come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(String),
}

impl InputSource {
    /// `None` or `-` means stdin
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("-") => InputSource::Stdin,
            Some(path) => InputSource::File(path.to_string()),
        }
    }

    pub fn open(&self) -> Result<Box<dyn BufRead>> {
        match self {
            InputSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            InputSource::File(path) => {
                let file = File::open(path).with_context(|| format!("failed to open input {path}"))?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }

    /// Short name for status lines: the file stem, or `stdin`
    pub fn stem(&self) -> &str {
        match self {
            InputSource::Stdin => "stdin",
            InputSource::File(path) => Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output"),
        }
    }
}
