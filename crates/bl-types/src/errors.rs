use thiserror::Error;

/// Main error type for the bayesloop system
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Model fit error: {0}")]
    ModelFit(#[from] ModelError),

    #[error("Candidate error: {0}")]
    Candidate(#[from] CandidateError),

    #[error("Loop state error: {0}")]
    State(#[from] StateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while evaluating the user function
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("User function {function} failed: {message}")]
    Failed { function: String, message: String },

    #[error("User function {function} returned {actual} results for {expected} inputs")]
    CardinalityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("User function {function} returned an empty output for input {index}")]
    EmptyOutput { function: String, index: usize },

    #[error("User function {function} was asked to evaluate an empty batch")]
    EmptyBatch { function: String },
}

/// Errors raised by a surrogate model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model fit failed: {message}")]
    FitFailed { message: String },

    #[error("Model prediction failed: {message}")]
    PredictionFailed { message: String },

    #[error("Model has no training data")]
    NoData,

    #[error("Model input dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model received {inputs} inputs but {targets} targets")]
    DataMismatch { inputs: usize, targets: usize },
}

/// Errors raised while computing candidate points
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CandidateError {
    #[error("Unknown context parameter: {name}")]
    UnknownContextParameter { name: String },

    #[error("Context value {value} is outside the domain of parameter {name}")]
    ContextOutOfDomain { name: String, value: f64 },

    #[error("Parameter space is empty")]
    EmptySpace,

    #[error("Invalid parameter space: {message}")]
    InvalidSpace { message: String },

    #[error("Invalid batch size: {batch_size}")]
    InvalidBatchSize { batch_size: usize },

    #[error("Acquisition evaluation failed: {0}")]
    Acquisition(#[from] ModelError),

    #[error("Acquisition optimizer found no finite value after {evaluations} evaluations")]
    NoFiniteValue { evaluations: usize },
}

/// Errors raised when recording observations in the loop state
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Input dimension mismatch: expected {expected}, got {actual}")]
    InputDimension { expected: usize, actual: usize },

    #[error("Output dimension mismatch: expected {expected}, got {actual}")]
    OutputDimension { expected: usize, actual: usize },

    #[error("Cannot build loop state from {inputs} inputs and {outputs} outputs")]
    ShapeMismatch { inputs: usize, outputs: usize },
}

/// Result type alias for bayesloop operations
pub type LoopResult<T> = Result<T, LoopError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::LoopError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::LoopError::Config(format!($($arg)*))
    };
}
