pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{header, info, key, status, success, summary_row, warn};
pub use table::{items_table, relationships_table};
pub use theme::{theme, Theme};
