/// Positions and camera rotation as they travel over the wire.
/// The relay never interprets these; they are opaque to it beyond storage.

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/generated/")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Shorthand constructor
pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

/// Camera rotation: `x` is pitch, `y` is yaw (radians).
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/generated/")]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
}

impl Rotation {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
