//! Clip playback and blending.
//!
//! The animation phase advances every [`Animator`] and writes its
//! [`BlendWeights`]. Clips are named time ranges; sampling poses is left to
//! whoever reads the weights.

use hearth_component::{Component, EcsError, EcsResult, Entity};
use serde::{Deserialize, Serialize};

use crate::pipeline::{FrameReport, Phase, PhasePlans, run_guarded};
use crate::world::World;

/// A named clip of fixed length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Clip name, as known to the asset side.
    pub name: String,
    /// Length in seconds.
    pub duration: f32,
}

impl AnimationClip {
    /// A clip of `duration` seconds.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] for a zero, negative or non-finite
    /// duration.
    pub fn new(name: impl Into<String>, duration: f32) -> EcsResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EcsError::invalid_argument(format!(
                "clip duration must be positive, got {duration}"
            )));
        }
        Ok(Self {
            name: name.into(),
            duration,
        })
    }
}

/// Playback cursor over one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPlayback {
    /// The clip.
    pub clip: AnimationClip,
    /// Cursor in seconds, within `0..=duration`.
    pub time: f32,
    /// Wrap at the end instead of stopping.
    pub looping: bool,
    /// Paused cursors stay put.
    pub playing: bool,
}

impl ClipPlayback {
    /// A cursor at the start of `clip`.
    #[must_use]
    pub fn new(clip: AnimationClip, looping: bool) -> Self {
        Self {
            clip,
            time: 0.0,
            looping,
            playing: true,
        }
    }

    /// Move the cursor by `step` seconds.
    pub fn advance(&mut self, step: f32) {
        if !self.playing {
            return;
        }
        let duration = self.clip.duration;
        let time = self.time + step;
        if self.looping {
            self.time = time.rem_euclid(duration);
        } else if time >= duration {
            self.time = duration;
            self.playing = false;
        } else if time <= 0.0 {
            self.time = 0.0;
            self.playing = false;
        } else {
            self.time = time;
        }
    }

    /// Returns `true` once a one-shot clip has reached its end.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.looping && !self.playing && self.time >= self.clip.duration
    }
}

/// Progress of a fade from the primary to the secondary clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossfade {
    /// Fade length in seconds.
    pub duration: f32,
    /// Seconds faded so far.
    pub elapsed: f32,
}

/// Plays up to two clips and blends between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    /// The main clip; `None` when nothing has been played.
    pub primary: Option<ClipPlayback>,
    /// The clip blended in on top.
    pub secondary: Option<ClipPlayback>,
    /// Weight of `secondary`, in `0..=1`.
    pub blend_factor: f32,
    /// Active fade, if any.
    pub crossfade: Option<Crossfade>,
    /// Playback rate; negative plays backwards.
    pub speed: f32,
}

impl Animator {
    /// An idle animator at normal speed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            primary: None,
            secondary: None,
            blend_factor: 0.0,
            crossfade: None,
            speed: 1.0,
        }
    }

    /// Play `clip` from the start, dropping any blend or fade.
    pub fn play(&mut self, clip: AnimationClip, looping: bool) {
        self.primary = Some(ClipPlayback::new(clip, looping));
        self.secondary = None;
        self.crossfade = None;
        self.blend_factor = 0.0;
    }

    /// Pause every clip where it is and drop any fade.
    pub fn stop(&mut self) {
        for playback in self.primary.iter_mut().chain(self.secondary.iter_mut()) {
            playback.playing = false;
        }
        self.crossfade = None;
    }

    /// Set the playback rate.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] for a non-finite rate.
    pub fn set_speed(&mut self, speed: f32) -> EcsResult<()> {
        if !speed.is_finite() {
            return Err(EcsError::invalid_argument(format!(
                "animation speed must be finite, got {speed}"
            )));
        }
        self.speed = speed;
        Ok(())
    }

    /// Loop two clips together with `factor` weight on the second. The
    /// factor is clamped to `0..=1`.
    pub fn blend(&mut self, clip_a: AnimationClip, clip_b: AnimationClip, factor: f32) {
        self.primary = Some(ClipPlayback::new(clip_a, true));
        self.secondary = Some(ClipPlayback::new(clip_b, true));
        self.crossfade = None;
        self.blend_factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
    }

    /// Fade from the current clip to `clip` over `duration` seconds. With
    /// nothing playing the clip starts immediately.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidArgument`] for a zero, negative or non-finite
    /// duration.
    pub fn crossfade_to(&mut self, clip: AnimationClip, duration: f32) -> EcsResult<()> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EcsError::invalid_argument(format!(
                "crossfade duration must be positive, got {duration}"
            )));
        }
        let Some(current) = &self.primary else {
            self.play(clip, true);
            return Ok(());
        };
        let looping = current.looping;
        self.secondary = Some(ClipPlayback::new(clip, looping));
        self.crossfade = Some(Crossfade {
            duration,
            elapsed: 0.0,
        });
        self.blend_factor = 0.0;
        Ok(())
    }

    /// Advance clips by `dt * speed` and any fade by `dt`, then report the
    /// resulting weights.
    pub fn advance(&mut self, dt: f32) -> BlendWeights {
        let step = dt * self.speed;
        if let Some(primary) = &mut self.primary {
            primary.advance(step);
        }
        if let Some(secondary) = &mut self.secondary {
            secondary.advance(step);
        }

        if let Some(fade) = &mut self.crossfade {
            fade.elapsed += dt;
            if fade.elapsed >= fade.duration {
                self.primary = self.secondary.take();
                self.crossfade = None;
                self.blend_factor = 0.0;
            } else {
                self.blend_factor = (fade.elapsed / fade.duration).clamp(0.0, 1.0);
            }
        }
        self.weights()
    }

    /// Weights for the current state, without advancing.
    #[must_use]
    pub fn weights(&self) -> BlendWeights {
        let time = |p: &Option<ClipPlayback>| p.as_ref().map_or(0.0, |p| p.time);
        let (primary, secondary) = match (&self.primary, &self.secondary) {
            (Some(_), Some(_)) => (1.0 - self.blend_factor, self.blend_factor),
            (Some(_), None) => (1.0, 0.0),
            (None, Some(_)) => (0.0, 1.0),
            (None, None) => (0.0, 0.0),
        };
        BlendWeights {
            primary,
            secondary,
            primary_time: time(&self.primary),
            secondary_time: time(&self.secondary),
        }
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Animator {
    fn type_name() -> &'static str {
        "Animator"
    }
}

/// Per-frame output of an [`Animator`]. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    /// Weight of the primary clip.
    pub primary: f32,
    /// Weight of the secondary clip.
    pub secondary: f32,
    /// Cursor of the primary clip.
    pub primary_time: f32,
    /// Cursor of the secondary clip.
    pub secondary_time: f32,
}

impl Component for BlendWeights {
    fn type_name() -> &'static str {
        "BlendWeights"
    }
}

/// The animation phase.
pub(crate) fn run(world: &mut World, plans: &PhasePlans, dt: f32, report: &mut FrameReport) {
    let Some(plan) = &plans.animators else {
        return;
    };
    for entity in world.matching(plan) {
        run_guarded(world, Phase::Animation, entity, report, |w| {
            animate(w, entity, dt)
        });
    }
}

fn animate(world: &mut World, entity: Entity, dt: f32) -> EcsResult<()> {
    let Some(animator) = world.get_mut::<Animator>(entity) else {
        return Ok(());
    };
    let weights = animator.advance(dt);
    world.add(entity, weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str, duration: f32) -> AnimationClip {
        AnimationClip::new(name, duration).unwrap()
    }

    #[test]
    fn test_clip_rejects_bad_duration() {
        assert!(AnimationClip::new("x", 0.0).is_err());
        assert!(AnimationClip::new("x", -1.0).is_err());
        assert!(AnimationClip::new("x", f32::INFINITY).is_err());
    }

    #[test]
    fn test_looping_wraps() {
        let mut animator = Animator::new();
        animator.play(clip("walk", 1.0), true);
        animator.advance(0.75);
        let weights = animator.advance(0.5);
        assert!((weights.primary_time - 0.25).abs() < 1e-6);
        assert_eq!(weights.primary, 1.0);
    }

    #[test]
    fn test_one_shot_clamps_and_stops() {
        let mut animator = Animator::new();
        animator.play(clip("jump", 0.5), false);
        animator.advance(2.0);
        let playback = animator.primary.as_ref().unwrap();
        assert_eq!(playback.time, 0.5);
        assert!(playback.is_finished());
    }

    #[test]
    fn test_speed_scales_cursor() {
        let mut animator = Animator::new();
        animator.play(clip("run", 4.0), true);
        animator.set_speed(2.0).unwrap();
        assert_eq!(animator.advance(0.5).primary_time, 1.0);
        assert!(animator.set_speed(f32::NAN).is_err());
    }

    #[test]
    fn test_blend_factor_is_clamped() {
        let mut animator = Animator::new();
        animator.blend(clip("a", 1.0), clip("b", 1.0), 1.5);
        assert_eq!(animator.blend_factor, 1.0);
        let weights = animator.weights();
        assert_eq!((weights.primary, weights.secondary), (0.0, 1.0));
    }

    #[test]
    fn test_crossfade_hands_over() {
        let mut animator = Animator::new();
        animator.play(clip("idle", 2.0), true);
        animator.crossfade_to(clip("walk", 1.0), 0.5).unwrap();

        let halfway = animator.advance(0.25);
        assert!((halfway.secondary - 0.5).abs() < 1e-6);

        animator.advance(0.25);
        assert!(animator.crossfade.is_none());
        assert!(animator.secondary.is_none());
        assert_eq!(animator.primary.as_ref().map(|p| p.clip.name.as_str()), Some("walk"));
        assert!(animator.crossfade_to(clip("x", 1.0), 0.0).is_err());
    }

    #[test]
    fn test_stop_pauses() {
        let mut animator = Animator::new();
        animator.play(clip("idle", 2.0), true);
        animator.advance(0.5);
        animator.stop();
        assert_eq!(animator.advance(0.5).primary_time, 0.5);
    }

    #[test]
    fn test_phase_writes_weights() {
        let mut world = World::new();
        let e = world.create_entity().unwrap();
        let mut animator = Animator::new();
        animator.play(clip("idle", 1.0), true);
        world.add(e, animator).unwrap();
        animate(&mut world, e, 0.1).unwrap();
        assert_eq!(world.get::<BlendWeights>(e).map(|w| w.primary), Some(1.0));
    }
}
