//! Template-driven extraction of delivery notices.
//!
//! A decoded body is classified by marker phrase into one of the known
//! [`Template`]s, and the template picks out the lines worth forwarding.
//!
//! ```text
//! body → Template::detect() → Template::select_lines() → Extraction
//! ```

pub mod template;

pub use template::{extract, Extraction, Template, TEMPLATES};
