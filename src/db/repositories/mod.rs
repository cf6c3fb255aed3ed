pub mod categories;
pub mod duplication;
pub mod items;
pub mod labels;
pub mod pack_items;
pub mod packs;
pub mod users;

pub use categories::CategoryRepository;
pub use duplication::duplicate_pack_in;
pub use items::ItemRepository;
pub use labels::LabelRepository;
pub use pack_items::PackItemRepository;
pub use packs::PackRepository;
pub use users::UserRepository;
