use crate::actions::ActionBinding;

/// Source of named actions, implemented by the built-in action set and by
/// plugins.
///
/// Providers list their bindings explicitly; the registry never inspects
/// provider types to discover handlers.
pub trait ActionProvider: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str;

    /// Bindings contributed by this provider, in registration order.
    fn actions(&self) -> Vec<ActionBinding>;
}
