// ============================================================================
// Module : chart
// ============================================================================
// Graphique en chandeliers : description (spec) puis rendu PNG (render)
// ============================================================================

pub mod render; // Rastérisation plotters + encodage PNG
pub mod spec; // Titre, palette, axes

pub use render::{CanvasConfig, ChartImage, ImageEncoding, RenderContext};
pub use spec::{chart_title, ChartSpec};
