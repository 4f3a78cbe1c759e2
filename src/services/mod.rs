pub mod health;
pub mod notifications;
pub mod registration;
pub mod reminder;
pub mod roles;
