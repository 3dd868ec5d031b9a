//! Translates window input into the core's pointer and key events.
//!
//! Hosts that deliver pointer events some other way (touch, a remote protocol, tests) can
//! trigger [`PointerMoved`] and friends directly and ignore these systems. Each system only
//! runs once the input resource it reads exists.

use bevy::prelude::*;
use bevy::window::CursorMoved;

use crate::events::FocusDumpRequested;
use crate::events::PointerClicked;
use crate::events::PointerMoved;
use crate::events::ResetRequested;
use crate::table::InteractionConfig;

pub fn forward_cursor_moves(
    mut commands: Commands,
    mut cursor_moved: MessageReader<CursorMoved>,
    windows: Query<&Window>,
) {
    for moved in cursor_moved.read() {
        let Ok(window) = windows.get(moved.window) else {
            continue;
        };
        commands.trigger(PointerMoved::new(
            moved.position,
            Vec2::new(window.width(), window.height()),
        ));
    }
}

pub fn forward_clicks(mut commands: Commands, buttons: Res<ButtonInput<MouseButton>>) {
    if buttons.just_pressed(MouseButton::Left) {
        commands.trigger(PointerClicked);
    }
}

pub fn forward_keys(
    mut commands: Commands,
    keyboard: Res<ButtonInput<KeyCode>>,
    config: Res<InteractionConfig>,
) {
    if keyboard.just_pressed(config.reset_key) {
        commands.trigger(ResetRequested);
    }
    if keyboard.just_pressed(config.dump_key) {
        commands.trigger(FocusDumpRequested);
    }
}
