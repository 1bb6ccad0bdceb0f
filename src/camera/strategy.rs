use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::detection::{FrameDetection, Landmark};

/// Face mesh indices used for the head-tilt proxy.
const NOSE_TIP: usize = 1;
const LEFT_EAR: usize = 234;
const RIGHT_EAR: usize = 454;

pub const DEFAULT_TILT_THRESHOLD: f64 = 0.06;
pub const DEFAULT_BOTTLE_MIN_SCORE: f64 = 0.6;
const BOTTLE_CLASS: &str = "bottle";

/// Decides whether a single frame looks like someone drinking.
pub trait DetectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_candidate(&self, frame: &FrameDetection) -> bool;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Face landmarks: head leaning back
    #[default]
    HeadTilt,
    /// Object boxes: bottle raised into the upper third of the frame
    BottleRaise,
}

impl StrategyKind {
    pub fn build(self, tilt_threshold: f64, bottle_min_score: f64) -> Box<dyn DetectionStrategy> {
        match self {
            StrategyKind::HeadTilt => Box::new(HeadTilt {
                threshold: tilt_threshold,
            }),
            StrategyKind::BottleRaise => Box::new(BottleRaise {
                min_score: bottle_min_score,
            }),
        }
    }
}

/// Nose depth minus mean ear depth; positive means the head leans back
/// (about 0.02 upright). Frames without the needed landmarks read as 0.
pub fn head_tilt(points: &[Landmark]) -> f64 {
    let (Some(nose), Some(left), Some(right)) = (
        points.get(NOSE_TIP),
        points.get(LEFT_EAR),
        points.get(RIGHT_EAR),
    ) else {
        return 0.0;
    };
    nose.z - (left.z + right.z) / 2.0
}

#[derive(Debug, Clone)]
pub struct HeadTilt {
    pub threshold: f64,
}

impl DetectionStrategy for HeadTilt {
    fn name(&self) -> &'static str {
        "head-tilt"
    }

    fn is_candidate(&self, frame: &FrameDetection) -> bool {
        match frame {
            FrameDetection::Landmarks { points } => head_tilt(points) > self.threshold,
            FrameDetection::Objects { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BottleRaise {
    pub min_score: f64,
}

impl DetectionStrategy for BottleRaise {
    fn name(&self) -> &'static str {
        "bottle-raise"
    }

    fn is_candidate(&self, frame: &FrameDetection) -> bool {
        match frame {
            FrameDetection::Objects {
                frame_height,
                objects,
            } => objects.iter().any(|object| {
                object.class_name == BOTTLE_CLASS
                    && object.score > self.min_score
                    && object.top() < frame_height / 3.0
            }),
            FrameDetection::Landmarks { .. } => false,
        }
    }
}
