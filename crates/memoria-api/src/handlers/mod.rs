pub mod health;
pub mod memorials;
pub mod uploads;
