use std::fmt;
use std::fs;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::Record;

/// Output formats for records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty-printed JSON object
    #[default]
    Json,
    Yaml,
    /// One `name: value` line per rule
    Flat,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "flat" => Ok(OutputFormat::Flat),
            _ => Err(Error::UnknownFormat {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Flat => "flat",
        })
    }
}

pub fn render_record(record: &Record, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(record)?),
        OutputFormat::Flat => Ok(record
            .iter()
            .map(|(name, value)| format!("{name}: {value}\n"))
            .collect()),
    }
}

pub fn save_record(record: &Record, output_path: &str, format: OutputFormat) -> Result<()> {
    let rendered = render_record(record, format)?;
    fs::write(output_path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn sample() -> Record {
        let mut record = Record::new();
        record.insert("price".to_string(), Value::Int(10));
        record.insert("hours".to_string(), Value::from(vec![8, 17]));
        record
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
    }

    #[test]
    fn test_unknown_format_names_the_format() {
        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, Error::UnknownFormat { ref name } if name == "xml"));
        assert_eq!(
            err.to_string(),
            "unknown output format 'xml' (expected json, yaml or flat)"
        );
    }

    #[test]
    fn test_render_json() {
        let json = render_record(&sample(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["price"], 10);
        assert_eq!(parsed["hours"][1], 17);
    }

    #[test]
    fn test_render_flat_is_name_ordered() {
        let flat = render_record(&sample(), OutputFormat::Flat).unwrap();
        assert_eq!(flat, "hours: [8, 17]\nprice: 10\n");
    }

    #[test]
    fn test_save_record_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.yaml");
        save_record(&sample(), path.to_str().unwrap(), OutputFormat::Yaml).unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("price: 10"));
    }
}
