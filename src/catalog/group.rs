use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use super::model::{Movie, MovieRecord, YearDocument};

/// Bucket movies by release year, then by title bucket.
pub fn group<I>(movies: I) -> BTreeMap<i32, YearDocument>
where
    I: IntoIterator<Item = Movie>,
{
    let mut years: BTreeMap<i32, YearDocument> = BTreeMap::new();
    for movie in movies {
        years
            .entry(movie.year)
            .or_insert_with(|| YearDocument::new(movie.year))
            .insert(movie);
    }
    years
}

/// Validate raw rows. Invalid rows are logged and skipped; the number
/// skipped is returned alongside the movies.
pub fn valid_movies<I>(records: I) -> (Vec<Movie>, usize)
where
    I: IntoIterator<Item = MovieRecord>,
{
    let mut skipped = 0;
    let movies: Vec<Movie> = records
        .into_iter()
        .filter_map(|record| match record.validate() {
            Ok(movie) => Some(movie),
            Err(e) => {
                warn!(?record, "Skipping row: {}", e);
                skipped += 1;
                None
            }
        })
        .collect();
    (movies, skipped)
}

/// All movies of one document, bucket by bucket.
pub fn flatten(doc: &YearDocument) -> Vec<Movie> {
    doc.buckets
        .values()
        .flat_map(|bucket| bucket.movies.iter().cloned())
        .collect()
}

/// Flatten several documents into one list, keeping only the last movie seen
/// for each case-insensitive title, sorted by title.
pub fn flatten_all<'a, I>(docs: I) -> Vec<Movie>
where
    I: IntoIterator<Item = &'a YearDocument>,
{
    let mut by_title: HashMap<String, Movie> = HashMap::new();
    for doc in docs {
        for movie in flatten(doc) {
            by_title.insert(movie.title.to_lowercase(), movie);
        }
    }

    let mut movies: Vec<Movie> = by_title.into_values().collect();
    movies.sort_by(|a, b| a.title.cmp(&b.title));
    movies
}
