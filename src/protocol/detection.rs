//! Decoded detection model

use serde::Serialize;

use crate::constants::GROUND_OFFSET_Y;
use crate::protocol::record::WireRecord;

/// Object centre in scene coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Box extent along the scene axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    /// Along x
    pub width: f32,
    /// Along y (vertical)
    pub height: f32,
    /// Along z (depth)
    pub length: f32,
}

/// Rotation about the vertical axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Heading {
    pub yaw_rad: f32,
}

impl Heading {
    pub fn from_radians(yaw_rad: f32) -> Self {
        Self { yaw_rad }
    }

    /// Yaw in degrees, as the renderer's Euler angles expect
    pub fn degrees(&self) -> f32 {
        self.yaw_rad.to_degrees()
    }

    /// Unit quaternion `[x, y, z, w]` for a rotation of `yaw` about +y
    pub fn quaternion(&self) -> [f32; 4] {
        let half = self.yaw_rad * 0.5;
        [0.0, half.sin(), 0.0, half.cos()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub position: Position,
    pub extent: Extent,
    pub rotation: Heading,
}

/// One decoded object
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    /// Tracker identifier; not unique over time
    pub id: i32,
    /// Not clamped here
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl From<WireRecord> for Detection {
    fn from(record: WireRecord) -> Self {
        Self {
            id: record.id,
            confidence: record.confidence,
            bbox: BoundingBox {
                position: Position {
                    x: record.x,
                    // Reported base height lifted by the ground offset, not a
                    // fixed plane at y = 0.5
                    y: record.y + GROUND_OFFSET_Y,
                    z: record.z,
                },
                extent: Extent {
                    width: record.width,
                    height: record.height,
                    length: record.length,
                },
                rotation: Heading::from_radians(record.pivot),
            },
        }
    }
}
