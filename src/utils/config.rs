//! Configuration and constants shared across the crate.

/// Current literal document schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Metric naming conventions used when deriving inclusive/exclusive columns
pub const INCLUSIVE_SUFFIX: &str = " (inc)";
pub const EXCLUSIVE_SUFFIX: &str = " (exc)";

/// Marker used by literal readers to classify a metric as inclusive
pub const INCLUSIVE_MARKER: &str = "(inc)";

/// Metric used when a caller does not name one
pub const DEFAULT_METRIC: &str = "time";

/// Column holding the display name of each node
pub const NAME_COLUMN: &str = "name";

/// Column added by `unify`: 0 = present in both, 1 = left only, 2 = right only
pub const MISSING_NODE_COLUMN: &str = "_missing_node";

/// Key under which the enumeration id is stored in literal metrics
pub const NID_KEY: &str = "_nid";

/// Frame attribute filled in when a reader omits it
pub const DEFAULT_FRAME_TYPE: &str = "None";
