pub mod activity;
pub mod attempts;
pub mod chunks;
pub mod exams;
pub mod feedback;
pub mod materials;
pub mod profiles;
pub mod sessions;
