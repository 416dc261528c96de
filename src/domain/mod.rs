//! Business logic for the task board. Each submodule exposes a service implementing its
//! "driving port" trait and declares the "driven port" traits it needs from the outside world.

pub mod task;
pub mod user;

#[cfg(test)]
pub mod test_util;
