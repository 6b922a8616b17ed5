pub mod encoding;
pub mod ordered;
pub mod tags;
pub mod taxonomy;

pub use encoding::TextEncoding;
pub use tags::{RowRange, TagTable};
pub use taxonomy::{Taxonomy, TaxonomyRecord, TaxonomySource};
