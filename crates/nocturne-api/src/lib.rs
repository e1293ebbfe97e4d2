pub mod error;
pub mod limits;
pub mod lobby;
pub mod room;
pub mod state;
pub mod status;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
