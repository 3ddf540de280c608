use std::path::Path;

use serde::de::DeserializeOwned;

use crate::config::ConfigError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, ConfigError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| ConfigError::Parse {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

pub fn from_file_with_path<T: DeserializeOwned>(file: &Path) -> Result<T, ConfigError> {
    let src = std::fs::read_to_string(file)
        .map_err(|source| ConfigError::Io { path: file.to_path_buf(), source })?;
    from_str_with_path(&src)
}
