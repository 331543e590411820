//! Entity models.
//!
//! One module per aggregate, each pairing typed entity structs with a
//! repository that reads and writes its collection through the store
//! gateway. Repositories borrow the store (and, where blobs are involved,
//! the object storage) handle - nothing reaches for ambient global state.
//!
//! Writes return `Result` with a structured error cause; reads propagate
//! store failures upward. Cascading deletes run leaves-before-parents and
//! are best effort: a crash mid-cascade leaves partial deletions with no
//! compensating rollback.

pub mod carousel;
pub mod category;
pub mod document;
pub mod product;
pub mod user;

pub use carousel::{Carousel, CarouselRepository};
pub use category::{CategoryRepository, MainCategory, SubCategory};
pub use document::{Document, DocumentRepository};
pub use product::{Product, ProductImage, ProductRepository};
pub use user::{User, UserRepository};

use serde_json::Value;

use crate::store::Fields;

/// Shorthand for building a field map from a `json!` object literal.
pub(crate) fn fields_of(value: Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}
