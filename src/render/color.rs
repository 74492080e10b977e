/// 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const GRAY: Rgb = Rgb(128, 128, 128);
    pub const RED: Rgb = Rgb(214, 39, 40);
    pub const BLUE: Rgb = Rgb(31, 119, 180);
    pub const SKY: Rgb = Rgb(135, 206, 235);

    pub fn scale(self, factor: f64) -> Rgb {
        let f = factor.clamp(0.0, 1.0);
        Rgb(
            (self.0 as f64 * f).round() as u8,
            (self.1 as f64 * f).round() as u8,
            (self.2 as f64 * f).round() as u8,
        )
    }

    /// Named colors accepted in request parameters, plus `#rrggbb`.
    pub fn parse(name: &str) -> Option<Rgb> {
        let name = name.trim();
        if let Some(hex) = name.strip_prefix('#') {
            if hex.len() == 6 {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                return Some(Rgb(channel(0)?, channel(2)?, channel(4)?));
            }
            return None;
        }
        let rgb = match name.to_ascii_lowercase().as_str() {
            "black" | "k" => Rgb::BLACK,
            "gray" | "grey" => Rgb::GRAY,
            "red" | "r" => Rgb::RED,
            "blue" | "b" => Rgb::BLUE,
            "green" | "g" => Rgb(44, 160, 44),
            "orange" => Rgb(255, 127, 14),
            "purple" => Rgb(148, 103, 189),
            "skyblue" => Rgb::SKY,
            _ => return None,
        };
        Some(rgb)
    }
}

/// The ten-color categorical cycle.
pub const CYCLE: [Rgb; 10] = [
    Rgb(31, 119, 180),
    Rgb(255, 127, 14),
    Rgb(44, 160, 44),
    Rgb(214, 39, 40),
    Rgb(148, 103, 189),
    Rgb(140, 86, 75),
    Rgb(227, 119, 194),
    Rgb(127, 127, 127),
    Rgb(188, 189, 34),
    Rgb(23, 190, 207),
];

pub fn cycle(i: usize) -> Rgb {
    CYCLE[i % CYCLE.len()]
}

/// Continuous color maps sampled on `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Colormap {
    Viridis,
    Coolwarm,
    RdBu,
    Hsv,
}

impl Colormap {
    pub fn from_name(name: &str) -> Colormap {
        match name.to_ascii_lowercase().as_str() {
            "coolwarm" => Colormap::Coolwarm,
            "rdbu" | "rdbu_r" => Colormap::RdBu,
            "hsv" => Colormap::Hsv,
            _ => Colormap::Viridis,
        }
    }

    pub fn at(self, t: f64) -> Rgb {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            Colormap::Viridis => interpolate(&VIRIDIS, t),
            Colormap::Coolwarm => interpolate(&COOLWARM, t),
            Colormap::RdBu => interpolate(&RDBU, t),
            Colormap::Hsv => hsv(t, 1.0, 1.0),
        }
    }
}

const VIRIDIS: [Rgb; 5] = [
    Rgb(68, 1, 84),
    Rgb(59, 82, 139),
    Rgb(33, 145, 140),
    Rgb(94, 201, 98),
    Rgb(253, 231, 37),
];

const COOLWARM: [Rgb; 3] = [Rgb(59, 76, 192), Rgb(221, 221, 221), Rgb(180, 4, 38)];

const RDBU: [Rgb; 3] = [Rgb(103, 0, 31), Rgb(247, 247, 247), Rgb(5, 48, 97)];

fn interpolate(stops: &[Rgb], t: f64) -> Rgb {
    let pos = t * (stops.len() - 1) as f64;
    let i = (pos.floor() as usize).min(stops.len() - 2);
    let f = pos - i as f64;
    let (a, b) = (stops[i], stops[i + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
    Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Hue, saturation and value in `[0, 1]`.
pub fn hsv(h: f64, s: f64, v: f64) -> Rgb {
    let h = (h.rem_euclid(1.0)) * 6.0;
    let sector = h.floor() as u32 % 6;
    let f = h - h.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb(byte(r), byte(g), byte(b))
}

/// Map `value` within `[lo, hi]` onto `[0, 1]`.
pub fn normalize(value: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        (value - lo) / (hi - lo)
    } else {
        0.5
    }
}
