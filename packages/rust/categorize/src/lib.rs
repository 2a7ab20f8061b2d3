//! Tab categorization: backend discovery, prompting, lenient response
//! parsing, the offline classifier and the tag pass.

pub mod capabilities;
pub mod content;
pub mod dispatcher;
pub mod offline;
pub mod parse;
pub mod prompt;
pub mod providers;
pub mod tags;

pub use capabilities::{Backend, BackendKind, Capabilities, CapabilityOverrides};
pub use content::ContentFetcher;
pub use dispatcher::{CategorizeProgress, Dispatcher, SilentCategorizeProgress};
pub use offline::{OfflineClassifier, url_main_category};
pub use parse::{ParseStage, ParsedCategories, parse_categories, parse_tags};
pub use providers::TextGenerator;
