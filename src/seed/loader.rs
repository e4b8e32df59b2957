use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::schema::{validate_schema, HeaderMapping};
use super::{SeedError, SeedResult};
use crate::catalog::{valid_movies, Movie, MovieRecord};

#[derive(Debug, Default)]
pub struct LoadedRows {
    pub movies: Vec<Movie>,
    pub skipped: usize,
}

/// First `*.csv` file in `dir`, by name. The directory is created if needed.
pub fn find_csv_file(dir: &Path) -> SeedResult<PathBuf> {
    fs::create_dir_all(dir)?;

    let mut csv_files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    csv_files.sort();

    match csv_files.len() {
        0 => Err(SeedError::NoInput(dir.to_path_buf())),
        1 => Ok(csv_files.remove(0)),
        n => {
            warn!("Found {} CSV files in {}, using {}", n, dir.display(), csv_files[0].display());
            Ok(csv_files.remove(0))
        }
    }
}

/// Parse every data row. Invalid rows are logged and skipped.
pub fn load_rows<R: Read>(
    reader: &mut csv::Reader<R>,
    mapping: &HeaderMapping,
) -> SeedResult<LoadedRows> {
    debug!(
        title = %mapping.title.name,
        genre = %mapping.genre.name,
        year = %mapping.year.name,
        "Reading columns"
    );

    let mut unreadable = 0;
    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        match result {
            Ok(record) => records.push(MovieRecord {
                title: record.get(mapping.title.index).map(str::to_string),
                genre: record.get(mapping.genre.index).map(str::to_string),
                year: record.get(mapping.year.index).map(str::to_string),
            }),
            Err(e) => {
                warn!(row = line + 2, "Skipping unreadable row: {}", e);
                unreadable += 1;
            }
        }
    }

    let (movies, invalid) = valid_movies(records);
    let loaded = LoadedRows {
        movies,
        skipped: unreadable + invalid,
    };
    info!("Loaded {} movies, skipped {} rows", loaded.movies.len(), loaded.skipped);
    Ok(loaded)
}

/// Validate the header of a CSV source and load its rows.
pub fn load_reader<R: Read>(source: R) -> SeedResult<LoadedRows> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(source);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mapping = validate_schema(&headers)?;
    load_rows(&mut reader, &mapping)
}

pub fn load_file(path: &Path) -> SeedResult<LoadedRows> {
    info!("Reading CSV file from {}", path.display());
    let file = fs::File::open(path)?;
    load_reader(file)
}
