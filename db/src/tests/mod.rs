mod device_locks;
mod marking;
mod registration;
mod sessions;
