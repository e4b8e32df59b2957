use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::db::Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub title: String,
    pub genre: String,
    pub year: i32,
    #[serde(rename = "coverURL", default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl Movie {
    pub fn new(title: impl Into<String>, genre: impl Into<String>, year: i32) -> Self {
        Self {
            title: title.into(),
            genre: genre.into(),
            year,
            cover_url: None,
        }
    }

    pub fn bucket_key(&self) -> BucketKey {
        bucket_key_for(&self.title)
    }
}

/// First-character class of a title within a year.
///
/// Ordering is letters `a` to `z`, then `num`, then `etc`, which is also
/// the order buckets are flattened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Letter(char),
    Num,
    Etc,
}

impl BucketKey {
    pub fn as_str(&self) -> std::borrow::Cow<'static, str> {
        match self {
            BucketKey::Letter(c) => std::borrow::Cow::Owned(c.to_string()),
            BucketKey::Num => std::borrow::Cow::Borrowed("num"),
            BucketKey::Etc => std::borrow::Cow::Borrowed("etc"),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl FromStr for BucketKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "num" => Ok(BucketKey::Num),
            "etc" => Ok(BucketKey::Etc),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_lowercase() => Ok(BucketKey::Letter(c)),
                    _ => Err(()),
                }
            }
        }
    }
}

/// Bucket for a title: ASCII letters map to their lowercase letter, numeric
/// characters to `num`, and everything else (empty titles included) to `etc`.
pub fn bucket_key_for(title: &str) -> BucketKey {
    match title.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => BucketKey::Letter(c.to_ascii_lowercase()),
        Some(c) if c.is_numeric() => BucketKey::Num,
        _ => BucketKey::Etc,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub movies: Vec<Movie>,
}

/// An unvalidated input row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieRecord {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("year is not a valid number: {0:?}")]
    InvalidYear(String),
}

impl MovieRecord {
    pub fn validate(&self) -> Result<Movie, RecordError> {
        let year_raw = non_blank(&self.year).ok_or(RecordError::Missing("year"))?;
        let year: i32 = year_raw
            .parse()
            .map_err(|_| RecordError::InvalidYear(year_raw.to_string()))?;
        if year == 0 {
            return Err(RecordError::Missing("year"));
        }
        let title = non_blank(&self.title).ok_or(RecordError::Missing("title"))?;
        let genre = non_blank(&self.genre).ok_or(RecordError::Missing("genre"))?;

        Ok(Movie::new(title, capitalize(genre), year))
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// All movies released in one year, split into first-character buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct YearDocument {
    pub id: String,
    pub year: i32,
    pub buckets: BTreeMap<BucketKey, Bucket>,
    /// Members that are not buckets, such as store bookkeeping fields.
    pub extra: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("document has no valid '{0}' field")]
    MissingField(&'static str),
    #[error("document id {id} does not match year {year}")]
    IdMismatch { id: String, year: i64 },
    #[error("bucket '{key}' is malformed: {source}")]
    Bucket {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn document_id(year: i32) -> String {
    format!("year_{}", year)
}

impl YearDocument {
    pub fn new(year: i32) -> Self {
        Self {
            id: document_id(year),
            year,
            buckets: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Add a movie to the bucket its title belongs to.
    pub fn insert(&mut self, movie: Movie) {
        self.buckets
            .entry(movie.bucket_key())
            .or_default()
            .movies
            .push(movie);
    }

    pub fn movie_count(&self) -> usize {
        self.buckets.values().map(|b| b.movies.len()).sum()
    }

    pub fn movies_mut(&mut self) -> impl Iterator<Item = &mut Movie> {
        self.buckets.values_mut().flat_map(|b| b.movies.iter_mut())
    }

    pub fn to_document(&self) -> Document {
        let mut obj = self.extra.clone();
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        obj.insert("year".to_string(), Value::from(self.year));
        for (key, bucket) in &self.buckets {
            let movies = bucket
                .movies
                .iter()
                .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
                .collect();
            let mut bucket_obj = Map::new();
            bucket_obj.insert("movies".to_string(), Value::Array(movies));
            obj.insert(key.to_string(), Value::Object(bucket_obj));
        }
        Value::Object(obj)
    }

    pub fn from_document(doc: Document) -> Result<Self, ModelError> {
        let Value::Object(obj) = doc else {
            return Err(ModelError::NotAnObject);
        };

        let mut id = None;
        let mut year = None;
        let mut buckets = BTreeMap::new();
        let mut extra = Map::new();

        for (key, value) in obj {
            match key.as_str() {
                "id" => id = value.as_str().map(str::to_string),
                "year" => year = value.as_i64(),
                _ => match (key.parse::<BucketKey>(), is_bucket(&value)) {
                    (Ok(bucket_key), true) => {
                        let bucket: Bucket = serde_json::from_value(value)
                            .map_err(|source| ModelError::Bucket { key: key.clone(), source })?;
                        buckets.insert(bucket_key, bucket);
                    }
                    _ => {
                        extra.insert(key, value);
                    }
                },
            }
        }

        let id = id.ok_or(ModelError::MissingField("id"))?;
        let year = year.ok_or(ModelError::MissingField("year"))?;
        let year32 = i32::try_from(year).map_err(|_| ModelError::MissingField("year"))?;
        if id != document_id(year32) {
            return Err(ModelError::IdMismatch { id, year });
        }

        Ok(Self {
            id,
            year: year32,
            buckets,
            extra,
        })
    }
}

fn is_bucket(value: &Value) -> bool {
    value.as_object().is_some_and(|o| o.contains_key("movies"))
}
