pub mod category;
pub mod item;
pub mod label;
pub mod pack;
pub mod user;
pub mod validation;

pub use category::Category;
pub use item::{Item, NewItem};
pub use label::{ItemLabel, PackLabel};
pub use pack::{Membership, Pack, PackItem, PackSummary};
pub use user::User;
