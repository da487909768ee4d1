#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod di;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod markup;
pub mod parser;
pub mod validate;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, LintConfig};
pub use di::{DiagramDocument, serialize, serialize_definitions};
pub use error::StructuralError;
pub use ir::{Definitions, ProcessGraph};
pub use layout::{
    DefinitionsLayout, Layout, compute_definitions_layout, compute_layout, layout,
};
pub use markup::write_definitions;
pub use parser::{parse_bpmn, parse_json};

/// Parses BPMN markup, lays out every process and returns the markup with
/// diagram interchange merged in.
pub fn autolayout(xml: &str, config: &Config) -> Result<String, StructuralError> {
    let defs = parse_bpmn(xml)?;
    let layout = compute_definitions_layout(&defs, &config.layout)?;
    serialize_definitions(&defs, &layout).merge_into(xml)
}
