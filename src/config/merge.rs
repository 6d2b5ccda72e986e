//! Precedence merging of raw configuration maps.
//!
//! Maps are flat, so merging is key-by-key: a key present in a higher-ranked
//! source replaces the value from every lower-ranked one.

use super::source::{ConfigSource, RawConfigMap};
use std::collections::BTreeMap;

/// Merge two maps, with `overlay` taking precedence over `base`.
///
/// # Example
/// ```
/// use dashboard_settings::config::{RawConfigMap, merge_over};
///
/// let base: RawConfigMap = [("MAX_ROWS".into(), "10".into()), ("LOG_LEVEL".into(), "info".into())].into();
/// let overlay: RawConfigMap = [("MAX_ROWS".into(), "20".into())].into();
/// let merged = merge_over(base, overlay);
/// assert_eq!(merged["MAX_ROWS"], "20");
/// assert_eq!(merged["LOG_LEVEL"], "info");
/// ```
pub fn merge_over(mut base: RawConfigMap, overlay: RawConfigMap) -> RawConfigMap {
    base.extend(overlay);
    base
}

/// Merge sources in ascending precedence order, regardless of input order.
pub fn merge(maps: Vec<(ConfigSource, RawConfigMap)>) -> RawConfigMap {
    merge_with_origins(maps).0
}

/// Like [`merge`], also reporting which source supplied each final value.
pub fn merge_with_origins(
    mut maps: Vec<(ConfigSource, RawConfigMap)>,
) -> (RawConfigMap, BTreeMap<String, ConfigSource>) {
    // Stable sort keeps input order among equal ranks.
    maps.sort_by_key(|(source, _)| source.rank());

    let mut origins = BTreeMap::new();
    let mut merged = RawConfigMap::new();
    for (source, map) in maps {
        for key in map.keys() {
            origins.insert(key.clone(), source.clone());
        }
        merged = merge_over(merged, map);
    }
    (merged, origins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn map(pairs: &[(&str, &str)]) -> RawConfigMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn dotenv() -> ConfigSource {
        ConfigSource::DotEnvFile(PathBuf::from(".env"))
    }

    #[test]
    fn test_merge_over_simple() {
        let merged = merge_over(map(&[("A", "1"), ("B", "2")]), map(&[("B", "3"), ("C", "4")]));
        assert_eq!(merged, map(&[("A", "1"), ("B", "3"), ("C", "4")]));
    }

    #[test]
    fn test_environment_beats_dotenv_beats_defaults() {
        let merged = merge(vec![
            (ConfigSource::Defaults, map(&[("K", "default"), ("D", "d")])),
            (dotenv(), map(&[("K", "file"), ("F", "f")])),
            (ConfigSource::Environment, map(&[("K", "env")])),
        ]);
        assert_eq!(merged["K"], "env");
        assert_eq!(merged["D"], "d");
        assert_eq!(merged["F"], "f");
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let merged = merge(vec![
            (ConfigSource::Environment, map(&[("K", "env")])),
            (ConfigSource::Defaults, map(&[("K", "default")])),
            (dotenv(), map(&[("K", "file")])),
        ]);
        assert_eq!(merged["K"], "env");
    }

    #[test]
    fn test_dotenv_beats_defaults_without_env() {
        let merged = merge(vec![
            (dotenv(), map(&[("K", "file")])),
            (ConfigSource::Defaults, map(&[("K", "default")])),
        ]);
        assert_eq!(merged["K"], "file");
    }

    #[test]
    fn test_origins() {
        let (_, origins) = merge_with_origins(vec![
            (ConfigSource::Defaults, map(&[("A", "1"), ("B", "1")])),
            (ConfigSource::Environment, map(&[("B", "2")])),
        ]);
        assert_eq!(origins["A"], ConfigSource::Defaults);
        assert_eq!(origins["B"], ConfigSource::Environment);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(Vec::new()).is_empty());
    }
}
