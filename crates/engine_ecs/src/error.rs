//! Registry error types.

use crate::system::Phase;

/// A registration rejected while building the [`SystemRegistry`].
///
/// Rejections are not fatal: the offending registration is skipped, logged,
/// and kept in [`SystemRegistry::rejections`] for inspection.
///
/// [`SystemRegistry`]: crate::registry::SystemRegistry
/// [`SystemRegistry::rejections`]: crate::registry::SystemRegistry::rejections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The same concrete awake system type was registered twice.
    #[error("duplicated awake system: {0}")]
    DuplicateAwake(&'static str),

    /// The same concrete destroy system type was registered twice.
    #[error("duplicated destroy system: {0}")]
    DuplicateDestroy(&'static str),

    /// The same concrete tick system type was registered twice for a phase.
    #[error("duplicated {phase} system: {system}")]
    DuplicateTick {
        /// The phase the duplicate targeted.
        phase: Phase,
        /// The system's type name.
        system: &'static str,
    },

    /// A second RPC handler was registered for the same request type.
    #[error("duplicated rpc handler for request {request}: {handler}")]
    DuplicateRpc {
        /// The request type name.
        request: &'static str,
        /// The rejected handler's type name.
        handler: &'static str,
    },
}
