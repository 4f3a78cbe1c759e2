pub mod callback_data;
pub mod commands;
pub mod context;
pub mod dialogue;
pub mod handlers;
pub mod keyboards;
