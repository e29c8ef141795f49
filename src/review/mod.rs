pub mod aggregate;
pub mod cache;
pub mod diagram;
pub mod fields;
pub mod natural_id;
pub mod render;
pub mod section;

pub use aggregate::{export_bundle, group_sections, summarize, write_section_export, ExportError};
pub use cache::ContentCache;
pub use diagram::{DiagramError, DiagramInstance, DiagramState};
pub use natural_id::{compare_ids, id_sort_key, IdSortKey};
pub use render::{build_view, raw_json, select_mode, ArtifactView, RenderMode};
pub use section::{classify, diagram_source, is_diagram_payload, SectionKey, CANONICAL_ORDER};
