pub mod attendance_record;
pub mod attendance_session;
pub mod course;
pub mod device_lock;
pub mod lecturer;
pub mod student;
pub mod user;
pub mod user_session;
