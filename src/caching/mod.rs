//! `Cache-Control` header construction and the policy deciding when to send it.

mod directive;
mod duration;
mod options;
mod policy;

pub use directive::{build_cache_control, directive_name, DirectiveSet, DirectiveValue};
pub use duration::{parse_duration, unit_seconds, UNITS_TO_SECONDS};
pub use options::{CacheOptions, OptionValue};
pub use policy::{should_attach, AppState, CacheControl};
