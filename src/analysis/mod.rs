pub mod joint_angle;
pub mod validity;

pub use joint_angle::{analyze_all_joints, joint_angle, Joint};
pub use validity::is_pose_valid;
