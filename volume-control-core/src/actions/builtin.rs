use serde::{Deserialize, Serialize};

use super::{ActionBinding, ActionContext};
use crate::models::error::ControlError;
use crate::models::hotkey::HotkeyPressed;
use crate::models::target::Subject;
use crate::traits::action_provider::ActionProvider;

/// Settings accepted by the volume step actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeStepSettings {
    /// Step override; the configured `volume_step` when absent.
    #[serde(default)]
    pub step: Option<f32>,
}

/// The actions every host gets out of the box.
#[derive(Debug, Default)]
pub struct BuiltinActions;

impl ActionProvider for BuiltinActions {
    fn name(&self) -> &str {
        "builtin"
    }

    fn actions(&self) -> Vec<ActionBinding> {
        vec![
            ActionBinding::new("Volume Up", Subject::Volume, volume_up),
            ActionBinding::new("Volume Down", Subject::Volume, volume_down),
            ActionBinding::new("Toggle Mute", Subject::Volume, toggle_mute),
            ActionBinding::new("Device Volume Up", Subject::Media, device_volume_up),
            ActionBinding::new("Device Volume Down", Subject::Media, device_volume_down),
            ActionBinding::new("Toggle Device Mute", Subject::Media, toggle_device_mute),
            ActionBinding::new("Next Target", Subject::Target, |ctx, _| {
                ctx.selector.select_next_session();
                Ok(())
            }),
            ActionBinding::new("Previous Target", Subject::Target, |ctx, _| {
                ctx.selector.select_previous_session();
                Ok(())
            }),
            ActionBinding::new("Toggle Target Lock", Subject::Target, |ctx, _| {
                ctx.selector.toggle_lock();
                Ok(())
            }),
            ActionBinding::new("Next Device", Subject::Media, |ctx, _| {
                ctx.selector.select_next_device();
                Ok(())
            }),
            ActionBinding::new("Previous Device", Subject::Media, |ctx, _| {
                ctx.selector.select_previous_device();
                Ok(())
            }),
        ]
    }
}

fn step_for(ctx: &ActionContext<'_>, event: &HotkeyPressed) -> Result<f32, ControlError> {
    let settings: VolumeStepSettings = event.settings.typed()?;
    Ok(settings.step.unwrap_or(ctx.config.volume_step).clamp(0.0, 1.0))
}

/// Adjust the selected session, or the selected device when no session is
/// selected.
fn adjust_target(ctx: &ActionContext<'_>, delta: f32) -> Result<(), ControlError> {
    let session = ctx.selector.selected_session();
    if session.is_virtual() {
        let device = ctx.selector.selected_device();
        let level = ctx.registry.adjust_device_volume(&device, delta)?;
        log::debug!("{} volume -> {:.2}", device.name(), level);
    } else {
        let level = ctx.registry.adjust_session_volume(&session, delta)?;
        log::debug!("{} volume -> {:.2}", session.process_name(), level);
    }
    Ok(())
}

fn volume_up(ctx: &ActionContext<'_>, event: &HotkeyPressed) -> Result<(), ControlError> {
    adjust_target(ctx, step_for(ctx, event)?)
}

fn volume_down(ctx: &ActionContext<'_>, event: &HotkeyPressed) -> Result<(), ControlError> {
    adjust_target(ctx, -step_for(ctx, event)?)
}

fn toggle_mute(ctx: &ActionContext<'_>, _event: &HotkeyPressed) -> Result<(), ControlError> {
    let session = ctx.selector.selected_session();
    if session.is_virtual() {
        ctx.registry.toggle_device_mute(&ctx.selector.selected_device())?;
    } else {
        ctx.registry.toggle_session_mute(&session)?;
    }
    Ok(())
}

fn device_volume_up(ctx: &ActionContext<'_>, event: &HotkeyPressed) -> Result<(), ControlError> {
    let device = ctx.selector.selected_device();
    ctx.registry.adjust_device_volume(&device, step_for(ctx, event)?)?;
    Ok(())
}

fn device_volume_down(ctx: &ActionContext<'_>, event: &HotkeyPressed) -> Result<(), ControlError> {
    let device = ctx.selector.selected_device();
    ctx.registry.adjust_device_volume(&device, -step_for(ctx, event)?)?;
    Ok(())
}

fn toggle_device_mute(ctx: &ActionContext<'_>, _event: &HotkeyPressed) -> Result<(), ControlError> {
    ctx.registry.toggle_device_mute(&ctx.selector.selected_device())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::tests::Fixture;
    use crate::actions::{ActionOutcome, ActionRegistry};
    use crate::models::hotkey::ActionSettings;
    use crate::models::target::TargetInfo;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn registry_with_builtins() -> ActionRegistry {
        let actions = ActionRegistry::new();
        actions.register_provider(&BuiltinActions).unwrap();
        actions
    }

    fn run(actions: &ActionRegistry, fx: &Fixture, name: &str, settings: ActionSettings) -> ActionOutcome {
        actions.invoke(name, &fx.ctx(), &HotkeyPressed::manual(name, settings))
    }

    #[test]
    fn builtins_are_all_registered() {
        let actions = registry_with_builtins();
        assert_eq!(actions.names().len(), 11);
        assert!(actions.contains("Toggle Target Lock"));
    }

    #[test]
    fn volume_down_targets_selected_session() {
        let fx = Fixture::new();
        let inst = fx.mock.add_session("d1", 100, "spotify.exe");
        fx.selector.select_session(TargetInfo::new(100, inst));
        let actions = registry_with_builtins();

        let outcome = run(&actions, &fx, "Volume Down", ActionSettings::default());
        assert_eq!(outcome, ActionOutcome::Completed(Subject::Volume));
        assert_relative_eq!(fx.mock.session_volume("d1", 100).unwrap(), 0.98);
        assert_relative_eq!(fx.mock.device_volume("d1").unwrap(), 1.0);
    }

    #[test]
    fn volume_falls_back_to_device_without_session() {
        let fx = Fixture::new();
        let actions = registry_with_builtins();
        let settings = ActionSettings::new(json!({ "step": 0.25 }));

        run(&actions, &fx, "Volume Down", settings);
        assert_relative_eq!(fx.mock.device_volume("d1").unwrap(), 0.75);
    }

    #[test]
    fn bad_step_settings_fail_the_action() {
        let fx = Fixture::new();
        let actions = registry_with_builtins();
        let settings = ActionSettings::new(json!({ "step": "loud" }));

        assert!(matches!(
            run(&actions, &fx, "Volume Up", settings),
            ActionOutcome::Failed(ControlError::ActionFailed { .. })
        ));
    }

    #[test]
    fn mute_toggles() {
        let fx = Fixture::new();
        let actions = registry_with_builtins();

        run(&actions, &fx, "Toggle Device Mute", ActionSettings::default());
        assert_eq!(fx.mock.device_muted("d1"), Some(true));

        let inst = fx.mock.add_session("d1", 100, "spotify.exe");
        fx.selector.select_session(TargetInfo::new(100, inst));
        run(&actions, &fx, "Toggle Mute", ActionSettings::default());
        assert_eq!(fx.mock.session_muted("d1", 100), Some(true));
    }

    #[test]
    fn target_actions_drive_the_selector() {
        let fx = Fixture::new();
        fx.mock.add_session("d1", 100, "a.exe");
        fx.mock.add_session("d1", 200, "b.exe");
        let actions = registry_with_builtins();

        run(&actions, &fx, "Next Target", ActionSettings::default());
        assert_eq!(fx.selector.selected_session().pid(), 100);
        run(&actions, &fx, "Previous Target", ActionSettings::default());
        assert_eq!(fx.selector.selected_session().pid(), 200);

        run(&actions, &fx, "Toggle Target Lock", ActionSettings::default());
        assert!(fx.selector.is_locked());
        run(&actions, &fx, "Next Target", ActionSettings::default());
        assert_eq!(fx.selector.selected_session().pid(), 200);
    }
}
