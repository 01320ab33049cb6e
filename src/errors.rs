use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error-devicehub-config-1 Invalid value for {var_name}: {value}")]
    InvalidValue { var_name: String, value: String },

    #[error("error-devicehub-config-2 Invalid statsd host: {host}")]
    InvalidStatsdHost { host: String },
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("error-devicehub-identity-1 No identity found for token: {token}")]
    NotFound { token: String },

    #[error("error-devicehub-identity-2 Identity resolution failed: {details}")]
    ResolutionFailed { details: String },
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("error-devicehub-dispatch-1 Payload decode failed for {kind} event: {source}")]
    DecodeFailed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("error-devicehub-dispatch-2 Event submission failed: {details}")]
    SubmitFailed { details: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("error-devicehub-engine-1 Chain compilation failed: {chain_id}: {details}")]
    CompilationFailed { chain_id: String, details: String },

    #[error("error-devicehub-engine-2 Unknown node type: {node_type}")]
    UnknownNodeType { node_type: String },

    #[error("error-devicehub-engine-3 Node execution failed: {node_type} at {node_id}: {details}")]
    ExecutionFailed {
        node_id: String,
        node_type: String,
        details: String,
    },

    #[error("error-devicehub-engine-4 Chain definition parse failed: {source}")]
    DefinitionParseFailed {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum ShadowError {
    #[error("error-devicehub-shadow-1 No shadow for device: {name}")]
    DeviceNotFound { name: String },
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("error-devicehub-cache-1 Rule chain resolution failed for product {product_id}: {details}")]
    ChainResolutionFailed {
        product_id: String,
        details: String,
    },

    #[error("error-devicehub-cache-2 No rule chain bound to product {product_id}")]
    ChainNotBound { product_id: String },

    #[error(transparent)]
    Compilation(#[from] EngineError),
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("error-devicehub-queue-1 MPSC queue operation failed: {operation}: {details}")]
    MpscOperationFailed { operation: String, details: String },

    #[error("error-devicehub-queue-2 Queue capacity exceeded: {queue_type}: {capacity}")]
    CapacityExceeded { queue_type: String, capacity: usize },
}
