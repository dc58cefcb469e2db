//! Score data model
//!
//! Plain serde types describing a score: documents, measures, segments and
//! the elements inside them. No layout or validation logic lives here.

pub mod attributes;
pub mod chord;
pub mod document;
pub mod measure;
pub mod model;
pub mod print;
pub mod segment;
pub mod types;

pub use attributes::*;
pub use chord::*;
pub use document::*;
pub use measure::*;
pub use model::*;
pub use print::*;
pub use segment::*;
pub use types::*;
