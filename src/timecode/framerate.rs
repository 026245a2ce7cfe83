use super::TimecodeError;
use std::fmt;
use std::str::FromStr;

/// Frame counting scheme of a timecode.
///
/// `fps` is the number of frames per timecode second (24, 25 or 30).
/// `video_speed` pulls the real rate down by 1000/1001, so 30 becomes 29.97.
/// `drop_frame` selects drop-frame counting and is only kept when `fps` is 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    fps: u32,
    video_speed: bool,
    drop_frame: bool,
}

impl Framerate {
    pub const FPS_23_976: Framerate = Framerate::new(24, true, false);
    pub const FPS_24: Framerate = Framerate::new(24, false, false);
    pub const FPS_24_975: Framerate = Framerate::new(25, true, false);
    pub const FPS_25: Framerate = Framerate::new(25, false, false);
    pub const FPS_29_97_ND: Framerate = Framerate::new(30, true, false);
    pub const FPS_29_97_DF: Framerate = Framerate::new(30, true, true);
    pub const FPS_30_ND: Framerate = Framerate::new(30, false, false);
    pub const FPS_30_DF: Framerate = Framerate::new(30, false, true);

    /// Preset list, in the order used by [`Framerate::from_index`].
    pub const PRESETS: [Framerate; 8] = [
        Framerate::FPS_23_976,
        Framerate::FPS_24,
        Framerate::FPS_24_975,
        Framerate::FPS_25,
        Framerate::FPS_29_97_ND,
        Framerate::FPS_29_97_DF,
        Framerate::FPS_30_ND,
        Framerate::FPS_30_DF,
    ];

    pub const fn new(fps: u32, video_speed: bool, drop_frame: bool) -> Self {
        let fps = if fps == 0 { 1 } else { fps };
        Self {
            fps,
            video_speed,
            drop_frame: drop_frame && fps == 30,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::PRESETS.get(index).copied()
    }

    /// Nominal frames per timecode second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn is_video_speed(&self) -> bool {
        self.video_speed
    }

    pub fn is_drop_frame(&self) -> bool {
        self.drop_frame
    }

    /// Real frames per wall-clock second.
    pub fn rate(&self) -> f64 {
        if self.video_speed {
            self.fps as f64 * 1000.0 / 1001.0
        } else {
            self.fps as f64
        }
    }

    /// Wall-clock duration of one frame, in seconds.
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.rate()
    }

    /// Wall-clock duration of one MTC quarter frame, in seconds.
    pub fn quarter_frame_duration(&self) -> f64 {
        self.frame_duration() / 4.0
    }

    /// Frame numbers in one 24 hour day at this framerate.
    pub fn frames_per_day(&self) -> i64 {
        let nominal = self.fps as i64 * 60 * 60 * 24;
        if self.drop_frame {
            // two frames dropped in 9 of every 10 minutes
            nominal - 2 * (24 * 60 - 24 * 6)
        } else {
            nominal
        }
    }

    pub fn speed_agnostic_description(&self) -> &'static str {
        match (self.fps, self.drop_frame) {
            (24, _) => "24/23.976 fps",
            (25, _) => "25/24.975 fps",
            (30, false) => "30/29.97 non-drop",
            (30, true) => "30/29.97 drop frame",
            _ => "unknown",
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Framerate::FPS_30_ND
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match (self.fps, self.video_speed) {
            (24, true) => "23.976".to_string(),
            (25, true) => "24.975".to_string(),
            (30, true) => "29.97".to_string(),
            (fps, _) => fps.to_string(),
        };
        if self.fps == 30 {
            let counting = if self.drop_frame { "df" } else { "nd" };
            write!(f, "{}{}", base, counting)
        } else {
            write!(f, "{}", base)
        }
    }
}

impl FromStr for Framerate {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let trimmed = trimmed.strip_suffix("fps").unwrap_or(&trimmed).trim();
        let (number, drop_frame) = if let Some(n) = trimmed.strip_suffix("df") {
            (n, true)
        } else if let Some(n) = trimmed.strip_suffix("nd") {
            (n, false)
        } else {
            (trimmed, false)
        };

        let framerate = match number {
            "23.976" | "23.98" => Framerate::FPS_23_976,
            "24" => Framerate::FPS_24,
            "24.975" | "24.98" => Framerate::FPS_24_975,
            "25" => Framerate::FPS_25,
            "29.97" => Framerate::new(30, true, drop_frame),
            "30" => Framerate::new(30, false, drop_frame),
            _ => return Err(TimecodeError::InvalidFramerate(s.to_string())),
        };
        Ok(framerate)
    }
}
