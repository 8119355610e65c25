pub mod state_loader;

pub use state_loader::{load_all_states, load_state_metadata, write_parts_index, LoadedState};
