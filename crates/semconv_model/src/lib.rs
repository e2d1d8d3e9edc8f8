//! # semconv_model
//!
//! Parsing and resolution of semantic convention YAML documents.
//!
//! Conventions are authored as small YAML files that reference each other
//! through `ref`, `extends`, and `include`. This crate loads those files
//! into a [`ConventionSet`] and resolves every cross-reference into a
//! closed in-memory model, with validation errors pinned to the exact
//! YAML source position they came from.
//!
//! ## Pipeline
//!
//! 1. **Parse**: each file becomes a list of [`group::Group`] values with
//!    position-carrying attributes.
//! 2. **Resolve**: [`ConventionSet::finish`] runs `ref`/`include` to a
//!    fixed point, resolves `extends` chains parent-first, binds `any_of`
//!    choice sets, and checks span events.
//! 3. **Query**: the resolved model exposes sorted attribute accessors and
//!    event lookups for downstream generators and checkers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use semconv_model::ConventionSet;
//!
//! let mut set = ConventionSet::new(true);
//! set.parse_file("model/http.yaml").unwrap();
//! set.parse_file("model/network.yaml").unwrap();
//! set.finish().unwrap();
//! for group in set.iter_groups() {
//!     println!("{}: {} attributes", group.semconv_id, group.attributes().len());
//! }
//! ```

pub mod attribute;
pub mod constraints;
pub mod doc;
pub mod error;
pub mod group;
pub mod set;
pub mod text;
pub mod validation;

pub use attribute::{
    Attribute, AttributeType, EnumMember, EnumType, EnumValue, EnumValueType, Example,
    PrimitiveType, RequirementLevel, Stability,
};
pub use constraints::{AnyOf, Constraint, Include};
pub use doc::Pos;
pub use error::{Error, Result, ValidationError};
pub use group::{Group, GroupKind, Instrument, SpanKind, UnitMember};
pub use set::ConventionSet;
pub use text::{MdLink, TextPart, TextWithLinks};
pub use validation::ValidationContext;
