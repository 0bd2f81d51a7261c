// ============================================================================
// Chart Spec - Description du graphique avant rastérisation
// ============================================================================
// Tout ce qui décide de l'apparence du graphique est calculé ici, sans
// toucher au backend de dessin : titre, dataset, couleurs, axes
//
// CONCEPT : Séparation des préoccupations
// - spec.rs : QUOI dessiner (testable sans pixels)
// - render.rs : COMMENT le dessiner (plotters + PNG)
// ============================================================================

use plotters::style::RGBColor;

use crate::models::{capitalize_first, CandleDirection, CandleSeries, FetchRequest, Timeframe};

/// Préfixe du titre : la plateforme d'où viennent les données
pub const EXCHANGE_LABEL: &str = "BYBIT";

/// Couleurs des chandeliers (corps, bordure et mèche)
pub const UP_COLOR: RGBColor = RGBColor(0x4C, 0xAF, 0x50); // #4CAF50
pub const DOWN_COLOR: RGBColor = RGBColor(0xFF, 0x52, 0x52); // #FF5252
pub const UNCHANGED_COLOR: RGBColor = RGBColor(0x9E, 0x9E, 0x9E); // #9E9E9E

/// Lignes de grille et axes
pub const GRID_COLOR: RGBColor = RGBColor(0x22, 0x26, 0x30); // #222630
/// Texte des graduations
pub const TICK_COLOR: RGBColor = RGBColor(0xB2, 0xB5, 0xBE);
pub const TITLE_COLOR: RGBColor = RGBColor(0xFF, 0xFF, 0xFF);

pub const TICK_FONT_SIZE: u32 = 18;
pub const TITLE_FONT_SIZE: u32 = 36;

/// Palette haussier / baissier / inchangé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandlePalette {
    pub up: RGBColor,
    pub down: RGBColor,
    pub unchanged: RGBColor,
}

impl Default for CandlePalette {
    fn default() -> Self {
        Self {
            up: UP_COLOR,
            down: DOWN_COLOR,
            unchanged: UNCHANGED_COLOR,
        }
    }
}

impl CandlePalette {
    pub fn color_for(&self, direction: CandleDirection) -> RGBColor {
        match direction {
            CandleDirection::Up => self.up,
            CandleDirection::Down => self.down,
            CandleDirection::Unchanged => self.unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPosition {
    Left,
    Right,
    Bottom,
}

/// Style partagé par les deux axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisStyle {
    pub tick_font_size: u32,
    pub tick_color: RGBColor,
    pub grid_visible: bool,
    pub grid_color: RGBColor,
}

impl Default for AxisStyle {
    fn default() -> Self {
        Self {
            tick_font_size: TICK_FONT_SIZE,
            tick_color: TICK_COLOR,
            grid_visible: true,
            grid_color: GRID_COLOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub position: AxisPosition,
    pub style: AxisStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleAlign {
    Start,
    Center,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSpec {
    pub text: String,
    pub font_size: u32,
    pub bold: bool,
    pub color: RGBColor,
    pub align: TitleAlign,
    pub padding_top: u32,
    pub padding_bottom: u32,
}

impl TitleSpec {
    /// Hauteur de la bande réservée au titre en haut du canvas
    pub fn band_height(&self) -> u32 {
        self.padding_top + self.font_size + self.padding_bottom
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub label: String,
    pub palette: CandlePalette,
}

/// Spécification complète du graphique en chandeliers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub title: TitleSpec,
    pub dataset: DatasetSpec,
    pub value_axis: AxisSpec,
    pub time_axis: AxisSpec,
    pub legend: bool,
    /// Format chrono des dates de l'axe X
    pub time_format: &'static str,
    pub timeframe: Timeframe,
}

impl ChartSpec {
    pub fn for_series(series: &CandleSeries) -> Self {
        let request = &series.request;
        let axis_style = AxisStyle::default();

        Self {
            title: TitleSpec {
                text: chart_title(request),
                font_size: TITLE_FONT_SIZE,
                bold: true,
                color: TITLE_COLOR,
                align: TitleAlign::Start,
                padding_top: 20,
                padding_bottom: 20,
            },
            dataset: DatasetSpec {
                label: dataset_label(&request.symbol),
                palette: CandlePalette::default(),
            },
            value_axis: AxisSpec {
                position: AxisPosition::Right,
                style: axis_style,
            },
            time_axis: AxisSpec {
                position: AxisPosition::Bottom,
                style: axis_style,
            },
            legend: false,
            time_format: request.timeframe.axis_format(),
            timeframe: request.timeframe,
        }
    }
}

/// "BYBIT Linear - BTCUSDT · 60"
pub fn chart_title(request: &FetchRequest) -> String {
    format!(
        "{} {} - {} · {}",
        EXCHANGE_LABEL,
        capitalize_first(request.segment.as_str()),
        request.symbol,
        request.timeframe.as_str()
    )
}

pub fn dataset_label(symbol: &str) -> String {
    format!("Price of {}", symbol)
}

/// Nombre de décimales des prix selon leur ordre de grandeur
///
/// BTC à 60000 n'a pas besoin de décimales, un memecoin à 0.00001234 si
pub fn price_precision(reference: f64) -> usize {
    let magnitude = reference.abs();
    if magnitude >= 1000.0 {
        1
    } else if magnitude >= 1.0 {
        3
    } else if magnitude >= 0.01 {
        5
    } else {
        8
    }
}

pub fn format_price(price: f64, precision: usize) -> String {
    format!("{:.*}", precision, price)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candle, MarketSegment};

    fn series(segment: MarketSegment, timeframe: Timeframe) -> CandleSeries {
        let request = FetchRequest::new("btc", None, timeframe, segment).unwrap();
        CandleSeries::new(request, vec![Candle::new(0, 1.0, 2.0, 0.5, 1.5)])
    }

    #[test]
    fn test_title_format() {
        let spec = ChartSpec::for_series(&series(MarketSegment::Linear, Timeframe::M60));
        assert_eq!(spec.title.text, "BYBIT Linear - BTCUSDT · 60");
        assert_eq!(spec.title.font_size, 36);
        assert!(spec.title.bold);
        assert_eq!(spec.title.align, TitleAlign::Start);
        assert_eq!(spec.title.color, TITLE_COLOR);
        assert_eq!(spec.title.band_height(), 76);
    }

    #[test]
    fn test_title_segments() {
        let spot = chart_title(&series(MarketSegment::Spot, Timeframe::D1).request);
        assert_eq!(spot, "BYBIT Spot - BTCUSDT · D");
        let inverse = chart_title(&series(MarketSegment::Inverse, Timeframe::H4).request);
        assert_eq!(inverse, "BYBIT Inverse - BTCUSDT · 240");
    }

    #[test]
    fn test_dataset_and_axes() {
        let spec = ChartSpec::for_series(&series(MarketSegment::Linear, Timeframe::M5));
        assert_eq!(spec.dataset.label, "Price of BTCUSDT");
        assert!(!spec.legend);
        assert_eq!(spec.value_axis.position, AxisPosition::Right);
        assert_eq!(spec.time_axis.position, AxisPosition::Bottom);
        assert_eq!(spec.value_axis.style.tick_font_size, 18);
        assert_eq!(spec.time_axis.style.grid_color, RGBColor(0x22, 0x26, 0x30));
        assert!(spec.time_axis.style.grid_visible);
        assert_eq!(spec.time_format, "%d/%m %H:%M");
    }

    #[test]
    fn test_palette() {
        let palette = CandlePalette::default();
        assert_eq!(palette.color_for(CandleDirection::Up), RGBColor(0x4C, 0xAF, 0x50));
        assert_eq!(palette.color_for(CandleDirection::Down), RGBColor(0xFF, 0x52, 0x52));
        assert_eq!(palette.color_for(CandleDirection::Unchanged), RGBColor(0x9E, 0x9E, 0x9E));
    }

    #[test]
    fn test_price_precision() {
        assert_eq!(format_price(64_123.456, price_precision(64_123.456)), "64123.5");
        assert_eq!(format_price(1.23456, price_precision(1.23456)), "1.235");
        assert_eq!(price_precision(0.000012), 8);
    }
}
