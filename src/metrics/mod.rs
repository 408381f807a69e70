pub mod run_state;
pub mod snapshot;

pub use run_state::RunState;
pub use snapshot::{ProgressCallback, ProgressSnapshot};
