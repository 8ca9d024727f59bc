//! Error types for the native/script boundary

/// Result type for bridge operations
pub type BindResult<T> = Result<T, BindError>;

/// Errors raised while converting values or dispatching native calls.
///
/// Conversion failures carry the position of the outermost argument being
/// converted, even when the failure happened deep inside a container.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    /// A script value could not be converted to the declared native type
    #[error("Error processing argument at index {index}, conversion failure from {actual} to {expected}")]
    Conversion {
        /// Argument position
        index: usize,
        /// Expected type (or set of tried alternatives)
        expected: String,
        /// Runtime type of the script value
        actual: String,
    },

    /// A fixed-size container had the wrong length
    #[error("Error processing argument at index {index}, expected {expected} elements but got {actual}")]
    Arity {
        /// Argument position
        index: usize,
        /// Declared arity
        expected: usize,
        /// Actual array length
        actual: usize,
    },

    /// A map key could not be converted
    #[error("Error processing argument at index {index}, unconvertible map key {key:?}")]
    Lookup {
        /// Argument position
        index: usize,
        /// Offending key, rendered for diagnostics
        key: String,
    },

    /// Value nesting exceeded the configured conversion depth
    #[error("Error processing argument at index {index}, value nested deeper than {limit} levels")]
    Depth {
        /// Argument position
        index: usize,
        /// Configured limit
        limit: usize,
    },

    /// Typed extraction from a native value failed
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// No class registered under this name
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// No module registered under this name
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    /// Class (or its bases) has no such method
    #[error("{class} has no method named {name}")]
    UnknownMethod {
        /// Receiver class
        class: String,
        /// Requested method
        name: String,
    },

    /// Module has no such function
    #[error("{module} has no function named {name}")]
    UnknownFunction {
        /// Module name
        module: String,
        /// Requested function
        name: String,
    },

    /// Class was registered without a constructor
    #[error("There is no constructor defined.")]
    NoConstructor(String),

    /// Accessor has no setter
    #[error("Property {name} of {class} is read-only")]
    ReadOnlyProperty {
        /// Receiver class
        class: String,
        /// Property name
        name: String,
    },

    /// Method or property used on something that is not a live wrapper
    #[error("Illegal invocation: expected {expected} receiver, got {actual}")]
    InvalidReceiver {
        /// Kind of receiver the operation needs
        expected: String,
        /// What was actually passed
        actual: String,
    },

    /// Handle refers to an object that has already been collected
    #[error("Object {0} has been collected")]
    DeadObject(String),

    /// Value is not a function
    #[error("{0} is not a function")]
    NotCallable(String),

    /// Native code reported a failure
    #[error("{0}")]
    Native(String),

    /// Host engine reported a failure
    #[error("Host error: {0}")]
    Host(String),
}

impl BindError {
    /// Argument position for conversion-class errors
    pub fn argument_index(&self) -> Option<usize> {
        match self {
            BindError::Conversion { index, .. }
            | BindError::Arity { index, .. }
            | BindError::Lookup { index, .. }
            | BindError::Depth { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Whether this error came from argument conversion
    pub fn is_conversion_failure(&self) -> bool {
        self.argument_index().is_some()
    }
}

impl From<String> for BindError {
    fn from(s: String) -> Self {
        BindError::Native(s)
    }
}

impl From<&str> for BindError {
    fn from(s: &str) -> Self {
        BindError::Native(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_message_names_index() {
        let err = BindError::Conversion {
            index: 0,
            expected: "(String | Number)".to_string(),
            actual: "boolean".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Error processing argument at index 0"));
        assert!(msg.contains("(String | Number)"));
        assert_eq!(err.argument_index(), Some(0));
    }

    #[test]
    fn test_invalid_receiver_names_both_sides() {
        let err = BindError::InvalidReceiver {
            expected: "wrapper".into(),
            actual: "integer".into(),
        };
        assert_eq!(err.to_string(), "Illegal invocation: expected wrapper receiver, got integer");
    }

    #[test]
    fn test_non_conversion_errors_have_no_index() {
        assert!(!BindError::Native("boom".into()).is_conversion_failure());
        assert_eq!(
            BindError::NoConstructor("View".into()).to_string(),
            "There is no constructor defined."
        );
    }
}
