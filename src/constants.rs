//! Application-wide constants

/// Valid node types for rule chains
pub const NODE_TYPE_FILTER: &str = "filter";
pub const NODE_TYPE_TRANSFORM: &str = "transform";
pub const NODE_TYPE_LOG_ACTION: &str = "log_action";
pub const NODE_TYPE_COMMAND: &str = "command";

/// Routing labels emitted by node handlers
pub const LABEL_TRUE: &str = "True";
pub const LABEL_FALSE: &str = "False";
pub const LABEL_SUCCESS: &str = "Success";

/// Persisted device connectivity status values
pub const STATUS_ONLINE: &str = "ONLINE";
pub const STATUS_OFFLINE: &str = "OFFLINE";

/// Type tag carried by the telemetry broadcast envelope
pub const ENVELOPE_TYPE_TELEMETRY: &str = "01";

/// Metadata keys attached to every chain message
pub const METADATA_DEVICE_ID: &str = "deviceId";
pub const METADATA_DEVICE_NAME: &str = "deviceName";
pub const METADATA_DEVICE_TYPE: &str = "deviceType";
pub const METADATA_PRODUCT_ID: &str = "productId";
pub const METADATA_ORG_ID: &str = "orgId";
pub const METADATA_OWNER: &str = "owner";
