// ============================================================================
// Chart Renderer - Rastérisation PNG
// ============================================================================
// Dessine une ChartSpec + une série de chandelles sur un canvas fixe
// (1600x900, fond sombre) puis encode le résultat en PNG
//
// CONCEPTS RUST :
// 1. Buffer RGB possédé : chaque rendu alloue le sien, aucun état partagé
// 2. spawn_blocking : la rastérisation (CPU) ne bloque pas le runtime tokio
// 3. Scopes : le backend emprunte le buffer, on le relâche avant l'encodage
//
// CONCEPTS PLOTTERS :
// 1. BitMapBackend::with_buffer : dessin en mémoire
// 2. ChartBuilder : zones de labels (axe des prix à droite)
// 3. CandleStick : un élément par chandelle
// ============================================================================

use std::ops::Range;

use chrono::{DateTime, Utc};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::prelude::*;
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, Instrument};

use crate::chart::spec::{format_price, price_precision, AxisPosition, ChartSpec, TitleAlign};
use crate::error::{ChartError, Result};
use crate::models::{Candle, CandleSeries, Timeframe};

// ============================================================================
// Constantes
// ============================================================================

pub const CANVAS_WIDTH: u32 = 1600;
pub const CANVAS_HEIGHT: u32 = 900;
pub const BACKGROUND_COLOR: RGBColor = RGBColor(0x16, 0x1A, 0x25); // #161A25

/// Police embarquée : le rendu ne dépend pas des polices du système
const FONT_FAMILY: &str = "sans-serif";
static FONT_REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

const PLOT_MARGIN: u32 = 20;
const TITLE_MARGIN_LEFT: i32 = 20;
const VALUE_LABEL_AREA: u32 = 140;
const TIME_LABEL_AREA: u32 = 50;
const X_LABELS: usize = 8;
const Y_LABELS: usize = 10;

/// Part d'un créneau occupée par le corps d'une chandelle
const BODY_RATIO: f64 = 0.7;
const MAX_BODY_WIDTH: f64 = 40.0;

/// Marge verticale au-dessus du plus haut et sous le plus bas
const PRICE_MARGIN_RATIO: f64 = 0.05;

// ============================================================================
// Types publics
// ============================================================================

/// Encodage de l'image produite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Png,
}

impl ImageEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageEncoding::Png => "image/png",
        }
    }
}

/// Image rendue : des octets opaques et leur encodage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub bytes: Vec<u8>,
    pub encoding: ImageEncoding,
}

impl ChartImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            encoding: ImageEncoding::Png,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Taille et fond du canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            background: BACKGROUND_COLOR,
        }
    }
}

// ============================================================================
// RenderContext
// ============================================================================

/// Contexte de rendu partagé : configuration immuable du canvas
///
/// CONCEPT : Réentrance
/// - Aucun état mutable : plusieurs rendus peuvent tourner en parallèle
/// - Chaque appel à render() alloue son propre buffer de pixels
#[derive(Debug, Clone)]
pub struct RenderContext {
    canvas: CanvasConfig,
}

impl RenderContext {
    /// Canvas 1600x900 sur fond #161A25
    pub fn new() -> Result<Self> {
        Self::with_canvas(CanvasConfig::default())
    }

    pub fn with_canvas(canvas: CanvasConfig) -> Result<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(ChartError::render("canvas dimensions must be non-zero"));
        }
        register_fonts()?;
        Ok(Self { canvas })
    }

    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    /// Rend la série en PNG sur le pool de threads bloquants de tokio
    ///
    /// Mêmes entrées => mêmes octets
    pub async fn render(&self, series: &CandleSeries) -> Result<ChartImage> {
        let spec = ChartSpec::for_series(series);
        let series = series.clone();
        let canvas = self.canvas;
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            rasterize(&spec, &series, &canvas)
        })
        .in_current_span()
        .await
        .map_err(|e| ChartError::render(format!("render task failed: {}", e)))?
    }

    /// Version synchrone, pour les appelants hors runtime
    pub fn render_blocking(&self, series: &CandleSeries) -> Result<ChartImage> {
        rasterize(&ChartSpec::for_series(series), series, &self.canvas)
    }
}

/// Enregistre les polices embarquées auprès de plotters
///
/// Ré-enregistrer remplace l'entrée existante : l'appel est idempotent
fn register_fonts() -> Result<()> {
    register_font(FONT_FAMILY, FontStyle::Normal, FONT_REGULAR)
        .map_err(|_| ChartError::render("embedded regular font is not a valid font file"))?;
    register_font(FONT_FAMILY, FontStyle::Bold, FONT_BOLD)
        .map_err(|_| ChartError::render("embedded bold font is not a valid font file"))?;
    Ok(())
}

// ============================================================================
// Rastérisation
// ============================================================================

/// Dessine la spec et les chandelles, puis encode en PNG
pub fn rasterize(spec: &ChartSpec, series: &CandleSeries, canvas: &CanvasConfig) -> Result<ChartImage> {
    if series.is_empty() {
        return Err(ChartError::render("cannot draw an empty series"));
    }
    if let Some(bad) = series.candles.iter().find(|c| !c.is_finite()) {
        return Err(ChartError::render(format!(
            "non-finite price in candle at {}",
            bad.timestamp
        )));
    }

    // Convertit les timestamps une fois pour toutes
    // CONCEPT RUST : collect sur des Result
    // - s'arrête à la première erreur
    let points = series
        .candles
        .iter()
        .map(|c| {
            c.time()
                .map(|t| (t, *c))
                .ok_or_else(|| ChartError::render(format!("timestamp out of range: {}", c.timestamp)))
        })
        .collect::<Result<Vec<(DateTime<Utc>, Candle)>>>()?;

    let x_range = time_range(&points, spec.timeframe)?;
    let y_range = price_range(series)?;
    let precision = price_precision(y_range.end.abs().max(y_range.start.abs()));

    let (width, height) = (canvas.width, canvas.height);
    let mut pixels = vec![0u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&canvas.background).map_err(ChartError::render)?;

        // Bande du titre en haut, le graphique en dessous
        let (title_area, body) = root.split_vertically(spec.title.band_height());

        let title = &spec.title;
        let weight = if title.bold { FontStyle::Bold } else { FontStyle::Normal };
        let title_style = (FONT_FAMILY, title.font_size, weight).into_font().color(&title.color);
        let (title_x, anchor) = match title.align {
            TitleAlign::Start => (TITLE_MARGIN_LEFT, Pos::new(HPos::Left, VPos::Top)),
            TitleAlign::Center => ((width / 2) as i32, Pos::new(HPos::Center, VPos::Top)),
        };
        title_area
            .draw(&Text::new(
                title.text.clone(),
                (title_x, title.padding_top as i32),
                title_style.pos(anchor),
            ))
            .map_err(ChartError::render)?;

        let value_area = match spec.value_axis.position {
            AxisPosition::Left => LabelAreaPosition::Left,
            AxisPosition::Right => LabelAreaPosition::Right,
            AxisPosition::Bottom => LabelAreaPosition::Bottom,
        };

        let mut chart = ChartBuilder::on(&body)
            .margin_left(PLOT_MARGIN)
            .margin_right(PLOT_MARGIN)
            .margin_bottom(PLOT_MARGIN)
            .set_label_area_size(value_area, VALUE_LABEL_AREA)
            .set_label_area_size(LabelAreaPosition::Bottom, TIME_LABEL_AREA)
            .build_cartesian_2d(x_range, y_range)
            .map_err(ChartError::render)?;

        // Grille et graduations partagées par les deux axes
        let axis = spec.value_axis.style;
        let grid = if axis.grid_visible {
            axis.grid_color.stroke_width(1)
        } else {
            TRANSPARENT.stroke_width(0)
        };
        let tick_style = (FONT_FAMILY, axis.tick_font_size).into_font().color(&axis.tick_color);
        let time_format = spec.time_format;
        let x_formatter = |t: &DateTime<Utc>| t.format(time_format).to_string();
        let y_formatter = |p: &f64| format_price(*p, precision);

        chart
            .configure_mesh()
            .bold_line_style(grid)
            .light_line_style(TRANSPARENT)
            .axis_style(axis.grid_color)
            .label_style(tick_style)
            .x_labels(X_LABELS)
            .y_labels(Y_LABELS)
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .draw()
            .map_err(ChartError::render)?;

        let plot_width = chart.plotting_area().dim_in_pixel().0;
        let body_width = candle_body_width(plot_width, points.len());
        let palette = spec.dataset.palette;
        debug!(candles = points.len(), body_width, "Drawing candlesticks");

        // Même couleur pour gain et perte : la direction (y compris
        // "inchangé") est résolue par la palette
        chart
            .draw_series(points.iter().map(|(t, c)| {
                let color = palette.color_for(c.direction());
                CandleStick::new(
                    *t,
                    c.open,
                    c.high,
                    c.low,
                    c.close,
                    color.filled(),
                    color.filled(),
                    body_width,
                )
            }))
            .map_err(ChartError::render)?;

        root.present().map_err(ChartError::render)?;
    }

    let bytes = encode_png(&pixels, width, height)?;
    debug!(bytes = bytes.len(), "Encoded chart as PNG");
    Ok(ChartImage::png(bytes))
}

/// Axe X : une demi-chandelle de marge de chaque côté
fn time_range(points: &[(DateTime<Utc>, Candle)], timeframe: Timeframe) -> Result<Range<DateTime<Utc>>> {
    let half = timeframe.duration() / 2;
    let (Some((first, _)), Some((last, _))) = (points.first(), points.last()) else {
        return Err(ChartError::render("cannot draw an empty series"));
    };

    let start = first
        .checked_sub_signed(half)
        .ok_or_else(|| ChartError::render(format!("time axis underflows before {}", first)))?;
    let end = last
        .checked_add_signed(half)
        .ok_or_else(|| ChartError::render(format!("time axis overflows after {}", last)))?;
    Ok(start..end)
}

/// Axe Y : du plus bas au plus haut, avec une marge de 5%
fn price_range(series: &CandleSeries) -> Result<Range<f64>> {
    let (Some(low), Some(high)) = (series.min_low(), series.max_high()) else {
        return Err(ChartError::render("cannot draw an empty series"));
    };

    if !low.is_finite() || !high.is_finite() {
        return Err(ChartError::render("series contains non-finite prices"));
    }

    let span = high - low;
    let margin = if span > 0.0 {
        span * PRICE_MARGIN_RATIO
    } else {
        // Série plate : on ouvre un peu l'axe pour que plotters ait une plage
        (high.abs() * 0.01).max(1e-8)
    };

    Ok((low - margin)..(high + margin))
}

fn candle_body_width(plot_width: u32, count: usize) -> u32 {
    let slot = plot_width as f64 / count.max(1) as f64;
    (slot * BODY_RATIO).clamp(1.0, MAX_BODY_WIDTH) as u32
}

fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(ChartError::render)?;
    Ok(bytes)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchRequest, MarketSegment};

    fn series(n: i64) -> CandleSeries {
        let request = FetchRequest::new("eth", None, Timeframe::M60, MarketSegment::Linear).unwrap();
        let candles = (0..n)
            .map(|i| {
                let open = 2000.0 + (i % 7) as f64 * 3.0;
                let close = open + if i % 3 == 0 { 4.0 } else if i % 3 == 1 { -4.0 } else { 0.0 };
                Candle::new(
                    1_700_000_000_000 + i * 3_600_000,
                    open,
                    open.max(close) + 2.0,
                    open.min(close) - 2.0,
                    close,
                )
            })
            .collect();
        CandleSeries::new(request, candles)
    }

    #[test]
    fn test_render_is_deterministic() {
        let ctx = RenderContext::new().unwrap();
        let data = series(50);
        let a = ctx.render_blocking(&data).unwrap();
        let b = ctx.render_blocking(&data).unwrap();
        assert_eq!(a.encoding, ImageEncoding::Png);
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_png_dimensions_and_background() {
        let ctx = RenderContext::new().unwrap();
        let chart = ctx.render_blocking(&series(10)).unwrap();
        assert_eq!(&chart.bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory_with_format(&chart.bytes, image::ImageFormat::Png)
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded.dimensions(), (1600, 900));
        assert_eq!(decoded.get_pixel(0, 0).0, [0x16, 0x1A, 0x25]);
    }

    #[test]
    fn test_single_candle_renders() {
        let ctx = RenderContext::new().unwrap();
        assert!(ctx.render_blocking(&series(1)).is_ok());
    }

    #[test]
    fn test_flat_series_renders() {
        let ctx = RenderContext::new().unwrap();
        let mut data = series(5);
        for c in data.candles.iter_mut() {
            *c = Candle::new(c.timestamp, 1.0, 1.0, 1.0, 1.0);
        }
        assert!(ctx.render_blocking(&data).is_ok());
    }

    #[test]
    fn test_empty_series_is_render_error() {
        let ctx = RenderContext::new().unwrap();
        let mut data = series(1);
        data.candles.clear();
        let err = ctx.render_blocking(&data).unwrap_err();
        assert!(matches!(err, ChartError::Render(_)));
    }

    #[test]
    fn test_non_finite_price_is_render_error() {
        let ctx = RenderContext::new().unwrap();
        let mut data = series(3);
        data.candles.iter_mut().for_each(|c| c.low = f64::NAN);
        assert!(matches!(ctx.render_blocking(&data), Err(ChartError::Render(_))));

        // Une seule chandelle invalide suffit
        let mut data = series(2);
        data.candles[0].open = f64::NAN;
        assert!(matches!(ctx.render_blocking(&data), Err(ChartError::Render(_))));

        let mut data = series(4);
        data.candles[2].high = f64::INFINITY;
        assert!(matches!(ctx.render_blocking(&data), Err(ChartError::Render(_))));
    }

    #[test]
    fn test_zero_canvas_rejected() {
        let canvas = CanvasConfig {
            width: 0,
            ..CanvasConfig::default()
        };
        assert!(RenderContext::with_canvas(canvas).is_err());
    }

    #[test]
    fn test_time_axis_overflow_is_render_error() {
        let ctx = RenderContext::new().unwrap();
        let mut data = series(1);
        // Dernier instant représentable : la demi-chandelle déborde
        data.candles[0].timestamp = DateTime::<Utc>::MAX_UTC.timestamp_millis();
        assert!(matches!(ctx.render_blocking(&data), Err(ChartError::Render(_))));
    }

    #[test]
    fn test_body_width_bounds() {
        assert_eq!(candle_body_width(1400, 100), 9);
        assert_eq!(candle_body_width(1400, 1), 40);
        assert_eq!(candle_body_width(10, 100), 1);
    }

    #[tokio::test]
    async fn test_async_render_matches_blocking() {
        let ctx = RenderContext::new().unwrap();
        let data = series(20);
        let a = ctx.render(&data).await.unwrap();
        let b = ctx.render_blocking(&data).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }
}
