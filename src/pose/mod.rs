pub mod frame;
pub mod landmark;

pub use frame::{PoseFrame, RawFrame};
pub use landmark::{Landmark, LandmarkIndex, Pose, RawLandmark};
