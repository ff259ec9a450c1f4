//! Combo detection and the celebration intensity tiers derived from it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Normal,
    Combo,
    Mega,
    God,
}

/// Particle budget and presentation for one grade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeProfile {
    pub particles: usize,
    pub scale: f64,
    /// Particles share one random burst center instead of rising from the bottom edge.
    pub center_burst: bool,
    /// Triggers the full-screen flash and shake.
    pub screen_effects: bool,
    /// Upper bound of the randomized start delay, in seconds.
    pub max_delay_secs: f64,
}

impl Grade {
    pub fn from_combo(combo_count: u32) -> Self {
        match combo_count {
            0..=2 => Grade::Normal,
            3..=4 => Grade::Combo,
            5..=9 => Grade::Mega,
            _ => Grade::God,
        }
    }

    pub fn profile(self) -> GradeProfile {
        match self {
            Grade::Normal => GradeProfile {
                particles: 40,
                scale: 1.0,
                center_burst: false,
                screen_effects: false,
                max_delay_secs: 0.8,
            },
            Grade::Combo => GradeProfile {
                particles: 60,
                scale: 1.5,
                center_burst: true,
                screen_effects: false,
                max_delay_secs: 0.8,
            },
            Grade::Mega => GradeProfile {
                particles: 100,
                scale: 2.5,
                center_burst: true,
                screen_effects: true,
                max_delay_secs: 0.8,
            },
            Grade::God => GradeProfile {
                particles: 200,
                scale: 4.0,
                center_burst: true,
                screen_effects: true,
                max_delay_secs: 2.0,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Normal => "normal",
            Grade::Combo => "combo",
            Grade::Mega => "mega",
            Grade::God => "god",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Length of the longest run of equal consecutive elements. Empty input is 0.
pub fn combo_count<T: PartialEq>(sequence: &[T]) -> u32 {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<&T> = None;

    for item in sequence {
        if previous == Some(item) {
            run += 1;
        } else {
            longest = longest.max(run);
            run = 1;
        }
        previous = Some(item);
    }

    longest.max(run)
}
