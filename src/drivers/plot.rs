use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::coord::Shift;
use plotters::prelude::*;
use crate::drivers::error::ScopeError;
use crate::sweep::{Layer, SweepScope, SweepWindow};
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    /// Also the occluder fill, so erased regions look empty.
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 300,
            background: RGBColor(0, 0, 0),
            palette: vec![GREEN, CYAN, YELLOW, MAGENTA, RED, BLUE, WHITE],
        }
    }
}
/// Renders a single channel, layers drawn in their draw order.
pub fn render_channel_png(window: &SweepWindow, style: &PlotStyle) -> Result<Vec<u8>, ScopeError> {
    render_png(style, style.height, |root| {
        draw_channel(root, window, color_for(style, 0), style)
    })
}
/// Renders every channel of the scope stacked top to bottom.
pub fn render_scope_png(scope: &SweepScope, style: &PlotStyle) -> Result<Vec<u8>, ScopeError> {
    let rows = scope.channel_count();
    if rows == 0 {
        return Err(ScopeError::Plot("scope has no channels".into()));
    }
    render_png(style, style.height * rows as u32, |root| {
        let areas = root.split_evenly((rows, 1));
        for (idx, (area, window)) in areas.iter().zip(scope.channels()).enumerate() {
            draw_channel(area, window, color_for(style, idx), style)?;
        }
        Ok(())
    })
}
fn color_for(style: &PlotStyle, idx: usize) -> RGBColor {
    if style.palette.is_empty() {
        WHITE
    } else {
        style.palette[idx % style.palette.len()]
    }
}
fn render_png<F>(style: &PlotStyle, height: u32, draw: F) -> Result<Vec<u8>, ScopeError>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<(), ScopeError>,
{
    let mut buffer = vec![0u8; (style.width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, height)).into_drawing_area();
        root.fill(&style.background)?;
        draw(&root)?;
        root.present()?;
    }
    encode_png(&buffer, style.width, height)
}
fn draw_channel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    window: &SweepWindow,
    color: RGBColor,
    style: &PlotStyle,
) -> Result<(), ScopeError> {
    let domain = window.domain().width();
    let (y_min, y_max) = window.y_range();
    let mut chart = ChartBuilder::on(area)
        .margin(4)
        .build_cartesian_2d(0f64..domain, y_min..y_max)?;
    for layer in window.layers() {
        match layer {
            Layer::Previous(buffer) | Layer::Current(buffer) => {
                let series = buffer.points().iter().map(|s| (s.x, s.y));
                chart.draw_series(LineSeries::new(series, &color))?;
            }
            Layer::Occluder(rect) => {
                let x2 = rect.x2.min(domain);
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(rect.x1, rect.y1), (x2, rect.y2)],
                    style.background.filled(),
                )))?;
            }
        }
    }
    Ok(())
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ScopeError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| ScopeError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
