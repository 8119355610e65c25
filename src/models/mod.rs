pub mod captcha;
pub mod hierarchy;
pub mod loaders;
pub mod outcome;
pub mod work_item;

pub use captcha::{CaptchaBatch, CaptchaToken};
pub use hierarchy::{flatten_states, ConstituencyMetadata, DistrictMetadata, StateMetadata};
pub use loaders::{load_all_states, load_state_metadata, write_parts_index, LoadedState};
pub use outcome::{FailureRecord, FetchOutcome};
pub use work_item::{PartRecord, WorkItem};
