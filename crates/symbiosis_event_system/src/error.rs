//! Error types raised by the event registry.

/// Errors that can occur while registering listeners or dispatching events.
///
/// Only registration and dispatch entry points produce these. Triggering an
/// event nobody listens to is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The supplied callback cannot be invoked.
    #[error("Registration callback is not callable: {target} has no method `{method}`")]
    NotInvocable {
        /// Name of the object the callback points at
        target: String,
        /// Method name that could not be resolved
        method: String,
    },
    /// The object handed to `dispatch` does not satisfy the event contract.
    #[error("Passed object must be a `{expected}` for registry identification")]
    TypeMismatch {
        /// Type the registry expected to receive
        expected: &'static str,
    },
}
