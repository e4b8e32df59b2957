pub mod error;
pub mod group;
pub mod model;
pub mod service;
pub mod textgen;

pub use error::{CatalogError, CatalogResult};
pub use group::{flatten, flatten_all, group, valid_movies};
pub use model::{bucket_key_for, document_id, Bucket, BucketKey, Movie, MovieRecord, YearDocument};
pub use service::{CatalogService, CatalogStatus, MovieList, Summary, YearListing};
pub use textgen::{HttpTextGenerator, TextGenError, TextGenerator};
