pub mod group;
pub mod homework;
pub mod lesson;
pub mod message;
pub mod reminder;
pub mod request;
pub mod schedule;
pub mod slot;
pub mod stats;
pub mod tutor;
pub mod user;
pub mod vacation;

pub use group::*;
pub use homework::*;
pub use lesson::*;
pub use message::*;
pub use reminder::*;
pub use request::*;
pub use schedule::*;
pub use slot::*;
pub use stats::*;
pub use tutor::*;
pub use user::*;
pub use vacation::*;
