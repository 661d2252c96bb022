pub mod flight;
pub mod key;
pub mod time;

pub use flight::{FlightRecord, FlightStatus};
pub use key::normalize_key;
pub use time::now_millis;
