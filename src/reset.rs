//! Returning the whole scene to the configuration it loaded in.

use bevy::prelude::*;

use crate::choreographer::TransitionPurpose;
use crate::error::InteractionError;
use crate::events::ResetRequested;
use crate::events::SceneReset;
use crate::machine::InteractionContext;
use crate::sequencer::ClipFamily;
use crate::table::ClipBinding;

impl InteractionContext<'_, '_> {
    /// Resets from any state. Calling it again right away changes nothing further.
    pub fn reset(&mut self) {
        let rewound = self.sequencer.rewind_family(ClipFamily::Camera);

        // Object clips started by bindings close again. Ambient loops keep running.
        let bound: Vec<ClipBinding> = self
            .table
            .bound_clips()
            .filter(|clip| ClipFamily::of(&clip.clip) == ClipFamily::Object)
            .cloned()
            .collect();
        for clip in &bound {
            if let Some(target) = self.registry.get(&clip.target) {
                self.sequencer.rewind(target, &clip.clip);
            }
        }

        if let Some(hovered) = self.state.hovered.take() {
            self.hover_exit(&hovered);
        }

        self.return_home();

        self.state.clear();
        self.scheduler.invalidate();
        self.lifecycle.restore_initial(&self.table);
        self.refresh_presentation();

        info!(
            "Reset: rewound {rewound} camera clip(s), scheduler at generation {}",
            self.scheduler.generation()
        );
        self.commands().trigger(SceneReset);
    }

    /// Starts the transition back to the home rig unless the camera is already there or
    /// already on its way.
    fn return_home(&mut self) {
        let rig = self.table.home_rig.clone();
        let home = match self.rig_transform(&rig) {
            Ok(home) => home,
            Err(err) => {
                warn!("Reset: {err}");
                return;
            },
        };
        let Ok((_, camera, transition)) = self.cameras.single() else {
            warn!("Reset: {}", InteractionError::NoCamera);
            return;
        };

        match transition {
            Some(transition) if transition.purpose == TransitionPurpose::Home => return,
            Some(_) => {},
            None => {
                let tolerance = self.config.arrival_tolerance;
                let at_home = camera.translation.distance(home.translation) <= tolerance
                    && camera.rotation.angle_between(home.rotation) <= tolerance;
                if at_home {
                    debug!("Reset: camera already at `{rig}`");
                    return;
                }
            },
        }

        let overview_focus = self.table.overview_focus;
        if let Err(err) = self.start_transition(&rig, home, overview_focus, TransitionPurpose::Home)
        {
            warn!("Reset: {err}");
        }
    }
}

/// Observer for the reset key and any UI reset control.
pub fn on_reset_requested(_reset: On<ResetRequested>, mut interaction: InteractionContext) {
    interaction.reset();
}
