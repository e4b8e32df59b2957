use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Query string parameters with forgiving key lookup.
#[derive(Debug, Default)]
pub struct QueryParams {
    map: HashMap<String, String>,
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = HashMap::<String, String>::deserialize(deserializer)?;
        Ok(QueryParams { map })
    }
}

impl QueryParams {
    /// Look up `key` exactly, then ignoring ASCII case (`year`, `Year`, `YEAR`).
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(val) = self.map.get(key) {
            return Some(val);
        }
        self.map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Like `get`, but blank values count as absent.
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        QueryParams {
            map: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_get_ignores_case() {
        let p = params(&[("Year", "2008"), ("title", "Up")]);
        assert_eq!(p.get("year"), Some("2008"));
        assert_eq!(p.get("TITLE"), Some("Up"));
        assert_eq!(p.get("genre"), None);
    }

    #[test]
    fn test_get_non_blank() {
        let p = params(&[("year", "  ")]);
        assert_eq!(p.get("year"), Some("  "));
        assert_eq!(p.get_non_blank("year"), None);
    }
}
