//! Actor state: the sprite that scripts move around.
//!
//! Stage coordinates have their origin at the centre with +y up. Heading 0°
//! points up and 90° points right. Every motion effect ends with a clamp to
//! the stage bounds.

use serde::{Deserialize, Serialize};

/// Smallest scale, in percent, a sprite can shrink to.
pub const MIN_SCALE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageBounds {
    pub width: f64,
    pub height: f64,
}

impl Default for StageBounds {
    fn default() -> Self {
        StageBounds { width: 480.0, height: 360.0 }
    }
}

impl StageBounds {
    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }

    /// Both dimensions are finite and positive.
    pub fn is_valid(&self) -> bool {
        [self.width, self.height].iter().all(|d| d.is_finite() && *d > 0.0)
    }

    /// These bounds, with any unusable dimension replaced by the default.
    pub fn sanitized(self) -> Self {
        let default = Self::default();
        let fix = |d: f64, fallback: f64| if d.is_finite() && d > 0.0 { d } else { fallback };
        StageBounds {
            width: fix(self.width, default.width),
            height: fix(self.height, default.height),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Speech {
    pub text: String,
    pub think: bool,
    /// Monotonic millisecond deadline; `None` shows until replaced.
    pub until: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundRequest {
    Play(String),
    StopAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorState {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    /// Percent of the costume's natural size.
    pub scale: f64,
    pub visible: bool,
    pub costume: usize,
    pub costume_count: usize,
    pub volume: f64,
    #[serde(skip)]
    pub speech: Option<Speech>,
    /// Sound commands for the host audio layer, drained once per frame.
    #[serde(skip)]
    pub sounds: Vec<SoundRequest>,
    #[serde(skip)]
    pub bounds: StageBounds,
}

impl Default for ActorState {
    fn default() -> Self {
        ActorState {
            x: 0.0,
            y: 0.0,
            heading: 90.0,
            scale: 100.0,
            visible: true,
            costume: 0,
            costume_count: 1,
            volume: 100.0,
            speech: None,
            sounds: Vec::new(),
            bounds: StageBounds::default(),
        }
    }
}

/// Normalize a heading into (-180, 180].
pub fn normalize_heading(degrees: f64) -> f64 {
    let h = degrees.rem_euclid(360.0);
    if h > 180.0 { h - 360.0 } else { h }
}

impl ActorState {
    pub fn new(bounds: StageBounds) -> Self {
        ActorState { bounds, ..Default::default() }
    }

    // -----------------------------------------------------------------------
    // Motion
    // -----------------------------------------------------------------------

    pub fn move_steps(&mut self, steps: f64) {
        let rad = self.heading.to_radians();
        self.x += steps * rad.sin();
        self.y += steps * rad.cos();
        self.clamp();
    }

    pub fn turn(&mut self, degrees: f64) {
        self.heading = normalize_heading(self.heading + degrees);
    }

    pub fn point_in_direction(&mut self, degrees: f64) {
        self.heading = normalize_heading(degrees);
    }

    pub fn go_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.clamp();
    }

    pub fn change_x(&mut self, dx: f64) {
        self.go_to(self.x + dx, self.y);
    }

    pub fn change_y(&mut self, dy: f64) {
        self.go_to(self.x, self.y + dy);
    }

    pub fn set_x(&mut self, x: f64) {
        self.go_to(x, self.y);
    }

    pub fn set_y(&mut self, y: f64) {
        self.go_to(self.x, y);
    }

    /// Reflect the heading off any stage edge the actor touches while moving
    /// towards it.
    pub fn bounce(&mut self) {
        let (hw, hh) = (self.bounds.half_width(), self.bounds.half_height());
        let rad = self.heading.to_radians();
        let (dx, dy) = (rad.sin(), rad.cos());
        if (self.x <= -hw && dx < 0.0) || (self.x >= hw && dx > 0.0) {
            self.heading = normalize_heading(-self.heading);
        }
        if (self.y <= -hh && dy < 0.0) || (self.y >= hh && dy > 0.0) {
            self.heading = normalize_heading(180.0 - self.heading);
        }
        self.clamp();
    }

    fn clamp(&mut self) {
        let (hw, hh) = (self.bounds.half_width(), self.bounds.half_height());
        if !self.x.is_finite() {
            self.x = 0.0;
        }
        if !self.y.is_finite() {
            self.y = 0.0;
        }
        self.x = self.x.clamp(-hw, hw);
        self.y = self.y.clamp(-hh, hh);
    }

    // -----------------------------------------------------------------------
    // Looks
    // -----------------------------------------------------------------------

    pub fn say(&mut self, text: &str, think: bool, until: Option<u64>) {
        self.speech = Some(Speech { text: text.to_string(), think, until });
    }

    pub fn clear_speech(&mut self) {
        self.speech = None;
    }

    /// Milliseconds the current speech bubble has left, if it is time-boxed.
    pub fn speech_remaining(&self, now: u64) -> Option<u64> {
        self.speech.as_ref()?.until.map(|until| until.saturating_sub(now))
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_scale(&mut self, percent: f64) {
        self.scale = if percent.is_finite() { percent.max(MIN_SCALE) } else { self.scale };
    }

    pub fn change_scale(&mut self, by: f64) {
        self.set_scale(self.scale + by);
    }

    pub fn next_costume(&mut self) {
        let count = self.costume_count.max(1);
        self.costume = (self.costume + 1) % count;
    }

    /// Switch to a 1-based costume number, wrapping around the costume count.
    pub fn switch_costume(&mut self, number: i64) {
        let count = self.costume_count.max(1) as i64;
        self.costume = number.saturating_sub(1).rem_euclid(count) as usize;
    }

    // -----------------------------------------------------------------------
    // Sound
    // -----------------------------------------------------------------------

    pub fn play_sound(&mut self, name: &str) {
        self.sounds.push(SoundRequest::Play(name.to_string()));
    }

    pub fn stop_sounds(&mut self) {
        self.sounds.push(SoundRequest::StopAll);
    }

    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_finite() {
            self.volume = volume.clamp(0.0, 100.0);
        }
    }

    pub fn change_volume(&mut self, by: f64) {
        self.set_volume(self.volume + by);
    }

    pub fn drain_sounds(&mut self) -> Vec<SoundRequest> {
        std::mem::take(&mut self.sounds)
    }
}
