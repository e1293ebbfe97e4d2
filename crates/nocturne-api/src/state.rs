use std::sync::Arc;

use nocturne_db::Database;
use nocturne_gateway::Dispatcher;
use nocturne_types::{Clock, Schedule};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub schedule: Schedule,
    /// Injected time source. Production wires `SystemClock`; tests pin the
    /// wall clock wherever a scenario needs it.
    pub clock: Arc<dyn Clock>,
    /// Dev override that skips the window gate on join and match.
    pub force_open: bool,
}
