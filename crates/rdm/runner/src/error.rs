//! Error types for the responder test runner
//!
//! Every variant here is fatal for a run: it means the registered test suite
//! itself is inconsistent and no test is executed.

/// Errors that can occur while registering or scheduling tests
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunnerError {
    #[error("{property} is declared in more than one test ({existing} and {declared_by})")]
    DuplicateProperty {
        property: String,
        existing: String,
        declared_by: String,
    },

    #[error("Test {0} is already registered")]
    DuplicateTest(String),

    #[error("{property} (required by {required_by}) not listed in any PROVIDES list")]
    MissingProperty {
        property: String,
        required_by: String,
    },

    #[error("Circular dependency found: {}", render_chain(.chain))]
    CircularDependency { chain: Vec<String> },

    #[error("{required_by} depends on unregistered test {name}")]
    UnknownDependency { name: String, required_by: String },

    #[error("Parameter {0} is not in the parameter catalog")]
    UnknownParameter(String),

    #[error("Test not found: {0}")]
    UnknownTest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Render a cycle as `A -> B -> A`
fn render_chain(chain: &[String]) -> String {
    let mut rendered = chain.join(" -> ");
    if let Some(first) = chain.first() {
        rendered.push_str(" -> ");
        rendered.push_str(first);
    }
    rendered
}

impl From<config::ConfigError> for RunnerError {
    fn from(err: config::ConfigError) -> Self {
        RunnerError::Config(err.to_string())
    }
}

/// Result type alias for runner operations
pub type RunnerResult<T> = Result<T, RunnerError>;
