/// The camera seam and the events it emits.
pub mod camera;
/// Coordinates and visible regions.
pub mod coordinates;
