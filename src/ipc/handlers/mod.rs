pub mod core;
pub mod courses;
pub mod directory;
pub mod exams;
pub mod staff;
pub mod students;
