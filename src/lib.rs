//! Code Clipper: structural code insertion for Go and Protocol Buffers
//!
//! Pastes generated snippets into existing source files at positions found
//! by walking the parsed AST, instead of relying on marker comments.
//!
//! # Architecture
//!
//! - [`position`] normalizes grammar positions into byte offsets
//! - [`selection`] defines the selector contract shared by both grammars
//! - [`go`] and [`proto`] hold the grammar adapters and selector catalogs
//! - [`clipper`] splices snippets and aggregates misses over a session
//! - [`config`] loads TOML clip plans and applies them to a source tree
//!
//! Every splice re-parses the current text, so offsets are never reused
//! after the text changes.
//!
//! # Example
//!
//! ```
//! use code_clipper::{Clipper, GoSelector, SelectOptions};
//!
//! let mut clipper = Clipper::new();
//! let code = clipper
//!     .paste_code_snippet_at(
//!         "main.go",
//!         "package main\n\nfunc main() {}\n",
//!         GoSelector::NewImport,
//!         &SelectOptions::new(),
//!         "\nimport \"fmt\"",
//!     )
//!     .unwrap();
//!
//! assert_eq!(code, "package main\nimport \"fmt\"\n\nfunc main() {}\n");
//! assert!(clipper.err().is_none());
//! ```

pub mod clipper;
pub mod config;
pub mod error;
pub mod go;
pub mod placeholder;
pub mod position;
pub mod proto;
pub mod selection;
pub mod write;

// Re-exports
pub use clipper::{splice, Clipper, MissingSelection};
pub use config::{apply_plan, load_from_path, load_from_str, ClipPlan, ConfigError};
pub use error::{ClipperError, ParseError, ValidationError};
pub use go::{GoParser, GoSelector};
pub use placeholder::{MissingPlaceholdersError, Tracer};
pub use position::{LineOffsetTable, OffsetPosition, SourcePos};
pub use proto::{parse_proto, ProtoSelector};
pub use selection::{PositionSelector, SelectOptions, Selection, SelectionData, Selector};
