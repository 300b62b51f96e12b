pub mod error;

pub use error::PlaceError;
