//! Abstract syntax trees for compiled templates and queries.
//!
//! - **[template]** - template elements: literal text, embedded queries, range blocks
//! - **[query]** - JSONPath queries: node identifier, segments, selectors
//! - **[filter]** - filter predicate expressions inside `?…` selectors
//!
//! All AST values are created by the parsers, immutable afterwards, and live
//! for the lifetime of the compiled template. Each type's `Display` renders a
//! canonical form that parses back to an equal AST.

pub mod filter;
pub mod query;
pub mod template;

pub use filter::{CompareOp, FilterExpr, FilterQuery, LogicalOp};
pub use query::{ArraySlice, NodeIdentifier, Query, Segment, SegmentKind, Selector};
pub use template::TemplateElement;
