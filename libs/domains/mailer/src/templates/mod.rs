//! Template lookup, shape extraction, and rendering.

mod registry;
mod renderer;
mod shape;

pub use registry::{LoadedTemplate, TEMPLATE_EXTENSIONS, TemplateRegistry, TemplateSource};
pub use renderer::Renderer;
pub use shape::{DeclaredField, PropsBlockExtractor, ShapeExtractor, split_declaration};
