//! Loading and writing `config.yml` with per-field comments.
//!
//! User values are merged over the defaults of the config type, so a file
//! written by an older version keeps working; keys it is missing are written
//! back together with their description.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub description: &'static str,
}

/// A config type that can be persisted as commented YAML.
pub trait ConfigSpec: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;
    fn fields() -> &'static [FieldMeta];
}

/// Loads the config, creating the file with defaults when it does not exist.
///
/// Path resolution:
/// - `config_path` given: used as is
/// - otherwise `base_dir/FILE_NAME`, or `./FILE_NAME` without a base dir
pub fn load_or_create<T: ConfigSpec>(
    config_path: Option<&Path>,
    base_dir: Option<&Path>,
) -> Result<T, ConfigError> {
    let path = resolve_path::<T>(config_path, base_dir);
    ensure_parent(&path)?;

    if !path.exists() {
        let config = T::default();
        write_with_comments(&config, &path)?;
        return Ok(config);
    }

    let raw = read(&path)?;
    let user_yaml = parse(&path, &raw)?;
    let incomplete = !missing_keys::<T>(&user_yaml).is_empty();

    let mut merged = serde_yaml::to_value(T::default())
        .map_err(|err| ConfigError::Validation(err.to_string()))?;
    merge_values(&mut merged, user_yaml);

    let config: T =
        serde_yaml::from_value(merged).map_err(|err| ConfigError::Validation(err.to_string()))?;

    if incomplete {
        write_with_comments(&config, &path)?;
    }

    Ok(config)
}

pub fn write_with_comments<T: ConfigSpec>(config: &T, path: &Path) -> Result<(), ConfigError> {
    ensure_parent(path)?;
    let yaml = render_with_comments(config)?;
    fs::write(path, yaml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders the config one key at a time, in `fields()` order, each preceded
/// by its description as a YAML comment.
pub fn render_with_comments<T: ConfigSpec>(config: &T) -> Result<String, ConfigError> {
    let Value::Mapping(mapping) =
        serde_yaml::to_value(config).map_err(|err| ConfigError::Validation(err.to_string()))?
    else {
        return Err(ConfigError::Validation(
            "config must serialize to a mapping".to_string(),
        ));
    };

    let mut out = String::new();
    for field in T::fields() {
        for line in field.description.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
        let key = Value::String(field.name.to_string());
        let val = mapping.get(&key).cloned().unwrap_or(Value::Null);
        let entry = serde_yaml::to_string(&Mapping::from_iter([(key, val)]))
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        out.push_str(entry.trim_end());
        out.push('\n');
    }

    Ok(out)
}

/// Field names declared by `T` that the user document does not set.
fn missing_keys<T: ConfigSpec>(user: &Value) -> Vec<&'static str> {
    let Value::Mapping(map) = user else {
        return T::fields().iter().map(|f| f.name).collect();
    };
    T::fields()
        .iter()
        .filter(|f| !map.contains_key(Value::String(f.name.to_string())))
        .map(|f| f.name)
        .collect()
}

fn merge_values(default: &mut Value, user: Value) {
    match (default, user) {
        (Value::Mapping(dest), Value::Mapping(src)) => {
            for (key, user_val) in src {
                match dest.get_mut(&key) {
                    Some(dest_val) => merge_values(dest_val, user_val),
                    None => {
                        dest.insert(key, user_val);
                    }
                }
            }
        }
        // An empty document parses as null; keep the defaults.
        (_, Value::Null) => {}
        (dest, other) => *dest = other,
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(path: &Path, raw: &str) -> Result<Value, ConfigError> {
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_path<T: ConfigSpec>(path: Option<&Path>, base_dir: Option<&Path>) -> PathBuf {
    match (path, base_dir) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(base)) => base.join(T::FILE_NAME),
        (None, None) => PathBuf::from(T::FILE_NAME),
    }
}

fn ensure_parent(path: &Path) -> Result<(), ConfigError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        workers: usize,
        label: String,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                workers: 4,
                label: "default".to_string(),
            }
        }
    }

    impl ConfigSpec for Sample {
        const FILE_NAME: &'static str = "sample.yml";

        fn fields() -> &'static [FieldMeta] {
            static FIELDS: [FieldMeta; 2] = [
                FieldMeta {
                    name: "workers",
                    description: "worker count",
                },
                FieldMeta {
                    name: "label",
                    description: "free text\nsecond line",
                },
            ];
            &FIELDS
        }
    }

    #[test]
    fn creates_file_with_defaults_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let cfg: Sample = load_or_create(None, Some(dir.path())).unwrap();
        assert_eq!(cfg, Sample::default());

        let written = fs::read_to_string(dir.path().join("sample.yml")).unwrap();
        assert!(written.contains("# worker count\nworkers: 4"));
        assert!(written.contains("# free text\n# second line\nlabel: default"));
    }

    #[test]
    fn merges_user_values_and_backfills_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yml");
        fs::write(&path, "workers: 9\n").unwrap();

        let cfg: Sample = load_or_create(Some(&path), None).unwrap();
        assert_eq!(cfg.workers, 9);
        assert_eq!(cfg.label, "default");

        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("workers: 9"));
        assert!(rewritten.contains("label: default"));
    }

    #[test]
    fn empty_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.yml");
        fs::write(&path, "").unwrap();

        let cfg: Sample = load_or_create(Some(&path), None).unwrap();
        assert_eq!(cfg, Sample::default());
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.yml");
        fs::write(&path, "workers: [unclosed\n").unwrap();

        let err = load_or_create::<Sample>(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn wrong_type_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.yml");
        fs::write(&path, "workers: lots\nlabel: x\n").unwrap();

        let err = load_or_create::<Sample>(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
