mod csv;
mod types;
mod validator;

pub use csv::CsvConnector;
pub use types::{RequiredColumn, DATE_ALIASES, VOLUME_ALIASES};
pub use validator::DataValidator;
