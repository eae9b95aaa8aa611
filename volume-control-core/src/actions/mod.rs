//! Name-keyed action bindings and their dispatch.
//!
//! Handlers run on the caller's thread. A failing or panicking handler is
//! logged and reported as [`ActionOutcome::Failed`]; it never unwinds into
//! the hotkey source.

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::config::ControlConfiguration;
use crate::models::error::ControlError;
use crate::models::hotkey::HotkeyPressed;
use crate::models::target::Subject;
use crate::registry::AudioRegistry;
use crate::selection::TargetSelector;
use crate::traits::action_provider::ActionProvider;

pub use builtin::{BuiltinActions, VolumeStepSettings};

/// Name the null action reports.
pub const NULL_ACTION_NAME: &str = "Null";

/// What a handler sees of the API while it runs.
pub struct ActionContext<'a> {
    pub registry: &'a AudioRegistry,
    pub selector: &'a TargetSelector,
    pub config: &'a ControlConfiguration,
}

pub type ActionHandler =
    Arc<dyn Fn(&ActionContext<'_>, &HotkeyPressed) -> Result<(), ControlError> + Send + Sync>;

/// A named, invocable action.
#[derive(Clone)]
pub struct ActionBinding {
    name: String,
    subject: Subject,
    handler: ActionHandler,
    null: bool,
}

impl ActionBinding {
    pub fn new<F>(name: impl Into<String>, subject: Subject, handler: F) -> Self
    where
        F: Fn(&ActionContext<'_>, &HotkeyPressed) -> Result<(), ControlError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            subject,
            handler: Arc::new(handler),
            null: false,
        }
    }

    /// The action returned for unknown names: `Subject::Null`, does nothing.
    pub fn null_action() -> Self {
        Self {
            name: NULL_ACTION_NAME.to_string(),
            subject: Subject::Null,
            handler: Arc::new(noop),
            null: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn is_null_action(&self) -> bool {
        self.null
    }

    /// Run the handler directly, without the registry's failure isolation.
    pub fn call(&self, ctx: &ActionContext<'_>, event: &HotkeyPressed) -> Result<(), ControlError> {
        (self.handler)(ctx, event)
    }
}

impl fmt::Debug for ActionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionBinding")
            .field("name", &self.name)
            .field("subject", &self.subject)
            .field("null", &self.null)
            .finish_non_exhaustive()
    }
}

/// Result of [`ActionRegistry::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(Subject),
    /// The name resolved to the null action.
    Skipped,
    Failed(ControlError),
}

/// Registry of actions by unique name.
#[derive(Default)]
pub struct ActionRegistry {
    bindings: RwLock<HashMap<String, ActionBinding>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. The first registration of a name wins.
    pub fn register(&self, binding: ActionBinding) -> Result<(), ControlError> {
        let mut bindings = self.bindings.write();
        if bindings.contains_key(binding.name()) {
            return Err(ControlError::DuplicateActionName(binding.name().to_string()));
        }
        log::debug!("Registered action '{}' ({:?})", binding.name(), binding.subject());
        bindings.insert(binding.name().to_string(), binding);
        Ok(())
    }

    pub fn register_fn<F>(&self, name: impl Into<String>, subject: Subject, handler: F) -> Result<(), ControlError>
    where
        F: Fn(&ActionContext<'_>, &HotkeyPressed) -> Result<(), ControlError> + Send + Sync + 'static,
    {
        self.register(ActionBinding::new(name, subject, handler))
    }

    /// Register every binding a provider lists.
    ///
    /// Stops at the first duplicate; bindings registered before it stay.
    pub fn register_provider(&self, provider: &dyn ActionProvider) -> Result<usize, ControlError> {
        let actions = provider.actions();
        let count = actions.len();
        for binding in actions {
            self.register(binding)?;
        }
        log::info!("Registered {} actions from '{}'", count, provider.name());
        Ok(count)
    }

    /// Look up an action; unknown names yield the null action.
    pub fn resolve(&self, name: &str) -> ActionBinding {
        self.bindings
            .read()
            .get(name)
            .cloned()
            .unwrap_or_else(ActionBinding::null_action)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve and run an action, isolating handler failures.
    ///
    /// The selector's subject is set to the action's subject before the
    /// handler runs.
    pub fn invoke(&self, name: &str, ctx: &ActionContext<'_>, event: &HotkeyPressed) -> ActionOutcome {
        let binding = self.resolve(name);
        if binding.is_null_action() {
            log::warn!("No action registered as '{}'", name);
            return ActionOutcome::Skipped;
        }

        ctx.selector.set_subject(binding.subject());
        let result = panic::catch_unwind(AssertUnwindSafe(|| binding.call(ctx, event)));

        let reason = match result {
            Ok(Ok(())) => return ActionOutcome::Completed(binding.subject()),
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("handler panicked: {}", panic_message(payload.as_ref())),
        };
        let error = ControlError::ActionFailed {
            name: name.to_string(),
            reason,
        };
        log::error!("{}", error);
        ActionOutcome::Failed(error)
    }
}

fn noop(_: &ActionContext<'_>, _: &HotkeyPressed) -> Result<(), ControlError> {
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
