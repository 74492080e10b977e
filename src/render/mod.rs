//! Backend-neutral figure description and the renderer seam.

pub mod color;
pub mod svg;

use crate::error::Result;
use crate::eval::AxisRange;

pub use color::{Colormap, Rgb};
pub use svg::SvgRenderer;

/// Turns a figure into encoded image bytes.
pub trait Renderer {
    /// File extension of the produced image, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, figure: &Figure) -> Result<Vec<u8>>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum Figure {
    Plane(Plane),
    Space(Space),
}

/// A 2D chart in data coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    pub x: AxisRange,
    pub y: AxisRange,
    pub layers: Vec<Layer>,
}

impl Plane {
    pub fn new(x: AxisRange, y: AxisRange) -> Self {
        Self {
            x,
            y,
            layers: Vec::new(),
        }
    }

    pub fn with(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    Line {
        points: Vec<(f64, f64)>,
        color: Rgb,
        width: u32,
    },
    Points {
        points: Vec<(f64, f64)>,
        color: Rgb,
        radius: u32,
    },
    Rects(Vec<Rect>),
    Polygon {
        points: Vec<(f64, f64)>,
        color: Rgb,
    },
    Segments {
        segments: Vec<[(f64, f64); 2]>,
        color: Rgb,
    },
}

/// A 3D scene: shaded quads and polylines inside a bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct Space {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
    pub quads: Vec<Quad>,
    pub paths: Vec<Path3>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Quad {
    pub corners: [[f64; 3]; 4],
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Path3 {
    pub points: Vec<[f64; 3]>,
    pub color: Rgb,
}

/// Orthographic camera used to flatten a [`Space`].
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub azimuth: f64,
    pub elevation: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            azimuth: -1.07,
            elevation: 0.63,
        }
    }
}

impl Camera {
    pub fn project(&self, p: [f64; 3]) -> (f64, f64) {
        let (sa, ca) = self.azimuth.sin_cos();
        let (se, ce) = self.elevation.sin_cos();
        (-p[0] * sa + p[1] * ca, -p[0] * ca * se - p[1] * sa * se + p[2] * ce)
    }

    /// Larger is further from the viewer.
    pub fn depth(&self, p: [f64; 3]) -> f64 {
        let (sa, ca) = self.azimuth.sin_cos();
        let (se, ce) = self.elevation.sin_cos();
        -(p[0] * ce * ca + p[1] * ce * sa + p[2] * se)
    }
}

impl Space {
    /// Flatten onto a plane: the scene is scaled into a unit box, quads are
    /// sorted back to front and shaded by orientation.
    pub fn project(&self, camera: &Camera) -> Plane {
        let unit = |p: [f64; 3]| {
            [
                color::normalize(p[0], self.x.min, self.x.max) - 0.5,
                color::normalize(p[1], self.y.min, self.y.max) - 0.5,
                (color::normalize(p[2], self.z.min, self.z.max) - 0.5) * 0.8,
            ]
        };

        let mut faces: Vec<(f64, Vec<(f64, f64)>, Rgb)> = self
            .quads
            .iter()
            .map(|q| {
                let pts = q.corners.map(unit);
                let depth = pts.iter().map(|p| camera.depth(*p)).sum::<f64>() / 4.0;
                let shade = shading(&pts);
                let projected = pts.iter().map(|p| camera.project(*p)).collect();
                (depth, projected, q.color.scale(shade))
            })
            .collect();
        faces.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut plane = Plane::new(AxisRange::new(-0.85, 0.85), AxisRange::new(-0.75, 0.75));
        for edge in box_edges() {
            plane.push(Layer::Line {
                points: edge.iter().map(|p| camera.project(*p)).collect(),
                color: Rgb::GRAY,
                width: 1,
            });
        }
        for (_, points, color) in faces {
            plane.push(Layer::Polygon { points, color });
        }
        for path in &self.paths {
            plane.push(Layer::Line {
                points: path.points.iter().map(|p| camera.project(unit(*p))).collect(),
                color: path.color,
                width: 2,
            });
        }
        plane
    }
}

fn shading(pts: &[[f64; 3]; 4]) -> f64 {
    let u = [pts[1][0] - pts[0][0], pts[1][1] - pts[0][1], pts[1][2] - pts[0][2]];
    let v = [pts[3][0] - pts[0][0], pts[3][1] - pts[0][1], pts[3][2] - pts[0][2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len < 1e-15 {
        return 1.0;
    }
    let light = [0.4, -0.5, 0.76];
    let light_len = (0.4f64 * 0.4 + 0.5 * 0.5 + 0.76 * 0.76).sqrt();
    let diffuse = ((n[0] * light[0] + n[1] * light[1] + n[2] * light[2]) / (len * light_len)).abs();
    0.35 + 0.65 * diffuse
}

fn box_edges() -> Vec<[[f64; 3]; 2]> {
    let h = 0.5;
    let zh = 0.4;
    let c = |x: f64, y: f64, z: f64| [x * h, y * h, z * zh];
    let mut edges = Vec::new();
    for &s in &[-1.0, 1.0] {
        for &t in &[-1.0, 1.0] {
            edges.push([c(-1.0, s, t), c(1.0, s, t)]);
            edges.push([c(s, -1.0, t), c(s, 1.0, t)]);
            edges.push([c(s, t, -1.0), c(s, t, 1.0)]);
        }
    }
    edges
}
