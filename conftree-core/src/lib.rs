//! Configuration trees for network devices: parsing vendor config dumps,
//! diffing them into device-ready patches, and filtering them.

pub mod diff;
pub mod format;
pub mod parser;
pub mod platform;
pub mod postproc;
pub mod range;
pub mod search;
pub mod tagging;
pub mod template;
pub mod tree;

pub use diff::{
    diff, diff_with_options, human_diff, human_diff_with_options, DiffError, DiffOptions,
    HumanDiffMode,
};
pub use format::{from_json, to_json};
pub use parser::{parse, parse_file, parse_with_options, ParseError, ParseOptions};
pub use platform::{Platform, PlatformError, PlatformSpec};
pub use postproc::{PostProcRule, NO_VALUE};
pub use range::RangeError;
pub use search::{search, IncludeMode, SearchError, SearchOptions};
pub use tagging::{TagRule, TaggingRules};
pub use template::Template;
pub use tree::{Node, TreeError, POST_TAG, PRE_TAG, SKIP_DRY_RUN_TAG};
