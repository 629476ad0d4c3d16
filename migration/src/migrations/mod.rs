pub mod m202601120001_create_users;
pub mod m202601120002_create_courses;
pub mod m202601120003_create_attendance;
pub mod m202601120004_create_device_locks;
pub mod m202601120005_create_user_sessions;
