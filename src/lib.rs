//! DOM accessibility snapshot engine: walks a parsed HTML document into a
//! compact, deterministic text view with stable `@ref:N` tokens that resolve
//! back to elements for follow-up commands.

pub mod content;
pub mod dom;
pub mod grep;
pub mod locator;
pub mod outline;
pub mod refs;
pub mod snapshot;
pub mod walk;

pub use grep::GrepOptions;
pub use refs::{RefMap, ResolveError};
pub use snapshot::{snapshot, Mode, SnapshotFormat, SnapshotOptions, SnapshotResult};
pub use walk::{LayoutProbe, NoLayout, Viewport};
