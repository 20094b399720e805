// ── Metadata-driven CRUD ──
//
// Descriptors in, table + form + option lists out.

mod descriptor;
mod form;
mod options;
mod paginate;
mod render;
mod screen;

pub use descriptor::{Accessor, ColumnDescriptor, FieldDescriptor, FieldKind, OptionsSource, Projection};
pub use form::{FormMode, FormState, build_payload};
pub use options::{OptionSets, SelectOption, project_options, resolve_options};
pub use paginate::{Page, paginate};
pub use render::{DisplayTokens, Row, TableView, display_value, plain_text, render_table};
pub use screen::{CrudScreen, EditTransform, ListView, Overlay, Phase, ScreenConfig};
