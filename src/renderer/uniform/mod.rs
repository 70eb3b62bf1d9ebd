pub mod camera;
pub mod light;
pub mod skin;
pub mod transform;
