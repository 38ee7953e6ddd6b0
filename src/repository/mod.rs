// Tree repositories over SawitDB and over relational backends

pub mod fields;
pub mod sawit;
pub mod sql;
pub mod tree;

pub use sawit::{SawitTreeRepository, parse_records};
pub use sql::SqlTreeRepository;
pub use tree::{TREES, Tree, TreeFilter, TreeRepository, TreeStatus};
