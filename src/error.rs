use thiserror::Error;

use crate::program::Token;

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Invariant {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Invariant {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Per-item anomalies discovered while tracing (ambiguous dispatch, failed resolution, missing
/// references, broken super invokes) are never reported through this type during a pass. They
/// are accumulated into side collections and only converted into an [`Error`] by the explicit
/// reporting calls that run after the fixpoint is done, such as
/// [`crate::diagnostics::MissingItemsReport::into_result`].
///
/// # Error Categories
///
/// ## Programming errors
/// - [`Error::Invariant`] - A structural invariant of the program graph or the lattice was broken
/// - [`Error::UnknownItem`] - A handle does not belong to the program it was used with
/// - [`Error::LockError`] - A shared result collection could not be locked
///
/// ## Input errors
/// - [`Error::DuplicateDefinition`] - Two definitions share the same descriptor
/// - [`Error::ClassNotFound`] - A class required by an embedder call is not defined
/// - [`Error::InvalidPattern`] - A wildcard pattern could not be compiled
/// - [`Error::InvalidRule`] - A rule cannot be materialized
///
/// ## Post-pass diagnostics
/// - [`Error::MissingDefinitions`] - Unsuppressed missing references, when configured as errors
/// - [`Error::CheckDiscardFailed`] - Items expected to be discarded survived
///
/// # Examples
///
/// ```rust,no_run
/// use shaker::{Error, prelude::*};
///
/// # fn run(program: &Program, rules: &RuleSet) -> shaker::Result<()> {
/// match shaker::shake(program, rules, ShakerConfig::default()) {
///     Ok(result) => println!("{} live types", result.live_types().len()),
///     Err(Error::Invariant { message, file, line }) => {
///         eprintln!("bug: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A structural invariant was violated.
    ///
    /// This error indicates an implementation bug or a corrupted program graph, e.g. a method
    /// whose holder does not exist, or a keep-info join that moved towards bottom. It is never
    /// expected from well-formed user input. The error includes the source location where the
    /// violation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the violated invariant
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Invariant - {file}:{line}: {message}")]
    Invariant {
        /// The message to be printed for the Invariant error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A handle was used that does not exist in the program.
    ///
    /// The associated [`Token`] identifies which handle failed to resolve.
    #[error("Unknown program item - {0}")]
    UnknownItem(Token),

    /// Two definitions with the same descriptor were added to a program.
    #[error("Duplicate definition - {0}")]
    DuplicateDefinition(String),

    /// A class that an embedder asked for is not defined in the program.
    #[error("Class not found - {0}")]
    ClassNotFound(String),

    /// A wildcard name pattern could not be compiled.
    #[error("Invalid pattern - {0}")]
    InvalidPattern(String),

    /// A rule is malformed, e.g. a back-reference points past the captured wildcards.
    #[error("Invalid rule - {0}")]
    InvalidRule(String),

    /// References to missing classes or members were found and are configured as errors.
    ///
    /// Only produced by [`crate::diagnostics::MissingItemsReport::into_result`], after the
    /// fixpoint has completed.
    #[error("Missing definitions ({count}): {}", items.join(", "))]
    MissingDefinitions {
        /// Number of unsuppressed missing items
        count: usize,
        /// Descriptors of the missing items, in sorted order
        items: Vec<String>,
    },

    /// Items matched by a check-discard rule survived tree shaking.
    ///
    /// The descriptors are sorted by canonical item ordering so that the message is
    /// reproducible between runs.
    #[error("Discard checks failed: {}", .0.join(", "))]
    CheckDiscardFailed(Vec<String>),

    /// Failed to lock target.
    ///
    /// This error occurs when a shared result collection used by a parallel batch phase
    /// could not be acquired.
    #[error("Failed to lock target")]
    LockError,

    /// Kept-graph error.
    ///
    /// Errors related to the recorded retention edge graph, e.g. an edge referring to a node
    /// that was never added.
    #[error("{0}")]
    GraphError(String),
}
