use plotters::prelude::*;

use crate::error::{Result, VizError};
use crate::render::{Camera, Figure, Layer, Plane, Renderer, Rgb};

/// Draws figures as SVG through plotters. Text is never emitted, so no font
/// backend is needed.
#[derive(Clone, Debug)]
pub struct SvgRenderer {
    pub width: u32,
    pub height: u32,
    pub camera: Camera,
}

impl SvgRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            camera: Camera::default(),
        }
    }
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl Renderer for SvgRenderer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn render(&self, figure: &Figure) -> Result<Vec<u8>> {
        let projected;
        let plane = match figure {
            Figure::Plane(plane) => plane,
            Figure::Space(space) => {
                projected = space.project(&self.camera);
                &projected
            }
        };
        let mut svg = String::new();
        draw_plane(&mut svg, (self.width, self.height), plane)?;
        Ok(svg.into_bytes())
    }
}

fn render_err(e: impl std::fmt::Display) -> VizError {
    VizError::Render(e.to_string())
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

fn draw_plane(buffer: &mut String, size: (u32, u32), plane: &Plane) -> Result<()> {
    let root = SVGBackend::with_string(buffer, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(plane.x.min..plane.x.max, plane.y.min..plane.y.max)
        .map_err(render_err)?;

    // Axes through the origin stand in for a labelled mesh.
    let axis = RGBColor(200, 200, 200).stroke_width(1);
    if plane.y.min < 0.0 && plane.y.max > 0.0 {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(plane.x.min, 0.0), (plane.x.max, 0.0)],
                axis,
            )))
            .map_err(render_err)?;
    }
    if plane.x.min < 0.0 && plane.x.max > 0.0 {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(0.0, plane.y.min), (0.0, plane.y.max)],
                axis,
            )))
            .map_err(render_err)?;
    }

    for layer in &plane.layers {
        match layer {
            Layer::Line {
                points,
                color,
                width,
            } => {
                chart
                    .draw_series(LineSeries::new(
                        points.iter().copied(),
                        rgb(*color).stroke_width(*width),
                    ))
                    .map_err(render_err)?;
            }
            Layer::Points {
                points,
                color,
                radius,
            } => {
                let style = rgb(*color).filled();
                chart
                    .draw_series(points.iter().map(|p| Circle::new(*p, *radius, style)))
                    .map_err(render_err)?;
            }
            Layer::Rects(rects) => {
                chart
                    .draw_series(rects.iter().map(|r| {
                        Rectangle::new([(r.x0, r.y0), (r.x1, r.y1)], rgb(r.color).filled())
                    }))
                    .map_err(render_err)?;
            }
            Layer::Polygon { points, color } => {
                chart
                    .draw_series(std::iter::once(Polygon::new(
                        points.clone(),
                        rgb(*color).filled(),
                    )))
                    .map_err(render_err)?;
            }
            Layer::Segments { segments, color } => {
                let style = rgb(*color).stroke_width(1);
                chart
                    .draw_series(
                        segments
                            .iter()
                            .map(|s| PathElement::new(vec![s[0], s[1]], style)),
                    )
                    .map_err(render_err)?;
            }
        }
    }

    root.present().map_err(render_err)?;
    Ok(())
}
