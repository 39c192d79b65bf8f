pub mod activity;
pub mod alphabet;
pub mod animator;

pub use activity::{FlapActivity, Registration};
pub use animator::FlapAnimator;
