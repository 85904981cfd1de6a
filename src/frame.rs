//! Which passes run in a frame.
//!
//! [`FramePlan`] picks the render passes from the config: the debug mesh
//! draw is optional, and the final composite is one of three modes.
//! [`FrameSchedule`] picks the particle slots each kernel and pass touches.

use crate::config::SceneConfig;
use crate::pingpong::PingPong;

/// How the scene reaches the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeMode {
    /// Copy the scene unchanged.
    Passthrough,
    /// Ray-march metaballs at full resolution straight into the surface.
    Raymarch,
    /// Ray-march into a smaller target, then upscale into the surface.
    RaymarchDownsampled { width: u32, height: u32 },
}

/// Passes for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramePlan {
    pub draw_debug_mesh: bool,
    pub composite: CompositeMode,
}

impl FramePlan {
    pub fn new(config: &SceneConfig, surface_width: u32, surface_height: u32) -> Self {
        let composite = if !config.render_raymarch {
            CompositeMode::Passthrough
        } else if config.downsample {
            let (width, height) =
                downsample_extent(surface_width, surface_height, config.downsample_rate);
            CompositeMode::RaymarchDownsampled { width, height }
        } else {
            CompositeMode::Raymarch
        };

        Self {
            draw_debug_mesh: config.render_debug_mesh,
            composite,
        }
    }
}

/// Size of the temporary metaball target for a downsample `rate`.
///
/// Each side is divided by `rate` and truncated, never below one texel.
/// Rates below 1 are treated as 1.
pub fn downsample_extent(width: u32, height: u32, rate: f32) -> (u32, u32) {
    let rate = if rate.is_finite() { rate.max(1.0) } else { 1.0 };
    let scale = |side: u32| ((side as f32 / rate) as u32).max(1);
    (scale(width), scale(height))
}

/// Particle slot work for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotSteps {
    /// Slot `cs_init_buffers` seeds, when the field needs seeding.
    pub init: Option<usize>,
    /// Slot `cs_update_buffers` writes. It reads the other one.
    pub update: Option<usize>,
    /// Slot the debug mesh and metaball passes read.
    pub render: usize,
    /// Flip the slot roles after submitting.
    pub swap: bool,
}

/// Seeding and ping-pong bookkeeping across frames.
///
/// Seeding writes the slot written "last frame", so the update that
/// follows reads it. While paused nothing is dispatched or swapped and the
/// passes read the slot written last.
#[derive(Debug, Default)]
pub struct FrameSchedule {
    seeded: bool,
}

impl FrameSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the field again on the next frame.
    pub fn reseed(&mut self) {
        self.seeded = false;
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Slot work for the next frame. `simulate` is false while paused.
    pub fn begin<T>(&mut self, slots: &PingPong<T>, simulate: bool) -> SlotSteps {
        let init = (!self.seeded).then(|| slots.previous_index());
        self.seeded = true;

        SlotSteps {
            init,
            update: simulate.then(|| slots.current_index()),
            render: if simulate {
                slots.current_index()
            } else {
                slots.previous_index()
            },
            swap: simulate,
        }
    }

    /// Close a frame started with [`FrameSchedule::begin`].
    pub fn finish<T>(&self, steps: &SlotSteps, slots: &mut PingPong<T>) {
        if steps.swap {
            slots.swap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// CPU stand-in for the particle textures: seeding stores `seed`, an
    /// update stores the other slot's value plus one.
    struct Field {
        slots: PingPong<()>,
        data: [u32; 2],
        schedule: FrameSchedule,
    }

    impl Field {
        fn new() -> Self {
            Self {
                slots: PingPong::from_fn(|_| ()),
                data: [0; 2],
                schedule: FrameSchedule::new(),
            }
        }

        /// Run one frame and return what the passes would draw.
        fn frame(&mut self, seed: u32, simulate: bool) -> u32 {
            let steps = self.schedule.begin(&self.slots, simulate);
            if let Some(slot) = steps.init {
                self.data[slot] = seed;
            }
            if let Some(slot) = steps.update {
                self.data[slot] = self.data[slot ^ 1] + 1;
            }
            let shown = self.data[steps.render];
            self.schedule.finish(&steps, &mut self.slots);
            shown
        }
    }

    #[test]
    fn test_first_frame_update_reads_seeded_slot() {
        let mut schedule = FrameSchedule::new();
        let slots = PingPong::from_fn(|_| ());
        let steps = schedule.begin(&slots, true);

        let (init, update) = (steps.init.unwrap(), steps.update.unwrap());
        assert_eq!(init, update ^ 1);
        assert_eq!(steps.render, update);
        assert!(steps.swap);
        assert!(schedule.is_seeded());

        assert_eq!(Field::new().frame(100, true), 101);
    }

    #[test]
    fn test_later_frames_do_not_reseed() {
        let mut field = Field::new();
        field.frame(100, true);
        let steps = field.schedule.begin(&field.slots, true);
        assert_eq!(steps.init, None);
    }

    #[test]
    fn test_paused_first_frame_renders_seeded_slot() {
        let mut field = Field::new();
        assert_eq!(field.frame(100, false), 100);
        assert_eq!(field.slots.current_index(), 0);
        assert_eq!(field.frame(100, true), 101);
    }

    #[test]
    fn test_pause_holds_last_written_slot() {
        let mut field = Field::new();
        assert_eq!(field.frame(100, true), 101);
        assert_eq!(field.frame(100, true), 102);

        let index = field.slots.current_index();
        assert_eq!(field.frame(100, false), 102);
        assert_eq!(field.frame(100, false), 102);
        assert_eq!(field.slots.current_index(), index);

        assert_eq!(field.frame(100, true), 103);
    }

    #[test]
    fn test_reseed_while_paused_shows_new_seed() {
        let mut field = Field::new();
        field.frame(100, true);
        field.frame(100, true);

        field.schedule.reseed();
        assert_eq!(field.frame(500, false), 500);
        assert_eq!(field.frame(500, true), 501);
    }

    #[test]
    fn test_reseed_while_running_feeds_same_frame_update() {
        let mut field = Field::new();
        field.frame(100, true);

        field.schedule.reseed();
        assert_eq!(field.frame(500, true), 501);
        assert_eq!(field.frame(500, true), 502);
    }

    #[test]
    fn test_default_plan() {
        let plan = FramePlan::new(&SceneConfig::default(), 1280, 720);
        assert!(plan.draw_debug_mesh);
        assert_eq!(plan.composite, CompositeMode::Raymarch);
    }

    #[test]
    fn test_raymarch_off_is_passthrough_even_when_downsampling() {
        let config = SceneConfig::default()
            .with_downsample(2.0)
            .with_raymarch_enabled(false);
        let plan = FramePlan::new(&config, 1280, 720);
        assert_eq!(plan.composite, CompositeMode::Passthrough);
    }

    #[test]
    fn test_downsampled_plan() {
        let config = SceneConfig::default()
            .with_downsample(2.5)
            .with_debug_mesh_enabled(false);
        let plan = FramePlan::new(&config, 1280, 720);
        assert!(!plan.draw_debug_mesh);
        assert_eq!(
            plan.composite,
            CompositeMode::RaymarchDownsampled { width: 512, height: 288 }
        );
    }

    #[test]
    fn test_downsample_extent() {
        assert_eq!(downsample_extent(1280, 720, 1.0), (1280, 720));
        assert_eq!(downsample_extent(1001, 3, 3.0), (333, 1));
        assert_eq!(downsample_extent(2, 2, 3.0), (1, 1));
        assert_eq!(downsample_extent(100, 100, 0.5), (100, 100));
        assert_eq!(downsample_extent(100, 100, f32::NAN), (100, 100));
    }
}
