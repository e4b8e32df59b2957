use super::{SeedError, SeedResult};

pub const REQUIRED_COLUMNS: [&str; 3] = ["Title", "Genre", "Year"];

/// Position and spelling of a required column in the input header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMapping {
    pub title: Column,
    pub genre: Column,
    pub year: Column,
}

/// Match the required columns against `headers`, ignoring case and
/// surrounding whitespace.
pub fn validate_schema<S: AsRef<str>>(headers: &[S]) -> SeedResult<HeaderMapping> {
    let find = |required: &str| {
        headers
            .iter()
            .position(|h| h.as_ref().trim().eq_ignore_ascii_case(required))
            .map(|index| Column {
                index,
                name: headers[index].as_ref().trim().to_string(),
            })
    };

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|&&col| find(col).is_none())
        .map(|col| col.to_string())
        .collect();

    match (find("Title"), find("Genre"), find("Year")) {
        (Some(title), Some(genre), Some(year)) => Ok(HeaderMapping { title, genre, year }),
        _ => Err(SeedError::SchemaInvalid { missing }),
    }
}
