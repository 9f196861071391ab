pub mod constraints;
pub mod crossover;
pub mod legs;
pub mod orientation;
pub mod out_of_frame;
pub mod pipeline;
pub mod prediction;
pub mod proportion;
pub mod smooth;
pub mod stability;

pub use pipeline::LandmarkStabilizer;
