//! Per-frame detection results produced by an external inference process.
//!
//! One JSON object per line, tagged by `kind`:
//!
//! ```text
//! {"kind":"landmarks","points":[{"x":0.5,"y":0.4,"z":-0.02}, ...]}
//! {"kind":"objects","frameHeight":480,"objects":[{"class":"bottle","score":0.91,"bbox":[210,40,60,180]}]}
//! ```

use serde::{Deserialize, Serialize};

/// Normalized face landmark position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "class")]
    pub class_name: String,
    pub score: f64,
    /// `[x, y, width, height]` in frame pixels, origin at the top-left corner.
    pub bbox: [f64; 4],
}

impl DetectedObject {
    pub fn top(&self) -> f64 {
        self.bbox[1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FrameDetection {
    Landmarks {
        points: Vec<Landmark>,
    },
    #[serde(rename_all = "camelCase")]
    Objects {
        frame_height: f64,
        objects: Vec<DetectedObject>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_frames() {
        let line = r#"{"kind":"objects","frameHeight":480,"objects":[{"class":"bottle","score":0.91,"bbox":[210,40,60,180]}]}"#;

        let frame: FrameDetection = serde_json::from_str(line).unwrap();

        match frame {
            FrameDetection::Objects {
                frame_height,
                objects,
            } => {
                assert_eq!(frame_height, 480.0);
                assert_eq!(objects[0].class_name, "bottle");
                assert_eq!(objects[0].top(), 40.0);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn landmark_depth_defaults_to_zero() {
        let line = r#"{"kind":"landmarks","points":[{"x":0.1,"y":0.2}]}"#;

        let frame: FrameDetection = serde_json::from_str(line).unwrap();

        assert_eq!(
            frame,
            FrameDetection::Landmarks {
                points: vec![Landmark {
                    x: 0.1,
                    y: 0.2,
                    z: 0.0
                }]
            }
        );
    }
}
