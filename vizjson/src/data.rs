//! Structured data (visualizations, configuration) is read from JSON or YAML
//! files on the file system.

use std::{fs, path::Path};

use eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;

use crate::Error;

/// The file formats from which we can load structured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
}

impl DataFormat {
    /// Guess the format of the given file from its extension.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::CannotDetermineDataFileType(path.to_path_buf()))?;
        match ext.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yml" | "yaml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFileType(ext.to_string())),
        }
    }

    /// Parse the given content in this format.
    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T, Error> {
        Ok(match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        })
    }
}

/// Load structured data of type `T` from the given file, detecting its format
/// from the file extension.
pub fn load_data<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let fmt = DataFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("while trying to read from {}", path.display()), e))?;
    fmt.parse(&content)
        .wrap_err_with(|| format!("while parsing {}", path.display()))
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use serde_json::Value as JsonValue;

    #[test]
    fn format_detection() {
        assert_eq!(
            DataFormat::from_path(&PathBuf::from("viz.json")).unwrap(),
            DataFormat::Json
        );
        assert_eq!(
            DataFormat::from_path(&PathBuf::from("viz.YML")).unwrap(),
            DataFormat::Yaml
        );
        match DataFormat::from_path(&PathBuf::from("viz.md")) {
            Err(Error::UnsupportedFileType(ext)) => assert_eq!(ext, "md"),
            other => panic!("expected unsupported file type, but got {:?}", other),
        }
        match DataFormat::from_path(&PathBuf::from("viz")) {
            Err(Error::CannotDetermineDataFileType(_)) => (),
            other => panic!("expected undeterminable file type, but got {:?}", other),
        }
    }

    #[test]
    fn json_and_yaml_agree() {
        let from_json: JsonValue = DataFormat::Json
            .parse(r#"{"id": "a1", "layers": [1, 2]}"#)
            .unwrap();
        let from_yaml: JsonValue = DataFormat::Yaml
            .parse("id: a1\nlayers:\n  - 1\n  - 2\n")
            .unwrap();
        assert_eq!(from_json, from_yaml);
    }
}
