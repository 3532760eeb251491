//! Zero-mean normalized cross-correlation over RGB images.
//!
//! Scores follow the usual TM_CCOEFF_NORMED definition summed over the three
//! channels. Window sums come from integral images so only the cross term
//! is computed per position.
use image::RgbImage;

use crate::common::Region;

// Windows or templates with less energy than this are treated as flat.
const FLAT_EPSILON: f64 = 1e-9;

/// Template pixels with their per-channel mean removed.
#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    width: u32,
    height: u32,
    centered: Vec<[f64; 3]>,
    norm_sq: f64,
}

impl PreparedTemplate {
    pub fn new(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let count = (width as f64 * height as f64).max(1.0);

        let mut sums = [0f64; 3];
        for pixel in image.pixels() {
            for c in 0..3 {
                sums[c] += pixel.0[c] as f64;
            }
        }
        let means = sums.map(|s| s / count);

        let centered: Vec<[f64; 3]> = image
            .pixels()
            .map(|p| {
                [
                    p.0[0] as f64 - means[0],
                    p.0[1] as f64 - means[1],
                    p.0[2] as f64 - means[2],
                ]
            })
            .collect();
        let norm_sq = centered
            .iter()
            .map(|v| v[0] * v[0] + v[1] * v[1] + v[2] * v[2])
            .sum();

        Self {
            width,
            height,
            centered,
            norm_sq,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Best position found by a search, relative to the search area origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub score: f64,
    pub x: u32,
    pub y: u32,
}

impl Scored {
    // Row-major order decides ties, so the earliest maximum wins.
    fn beats(&self, other: &Scored) -> bool {
        self.score > other.score
            || (self.score == other.score && (self.y, self.x) < (other.y, other.x))
    }
}

/// A validated rectangle of an image plus its integral tables.
pub struct SearchArea<'a> {
    image: &'a RgbImage,
    area: Region,
    sum: Vec<[u64; 3]>,
    sq: Vec<[u64; 3]>,
}

impl<'a> SearchArea<'a> {
    /// `area` must lie inside `image`.
    pub fn new(image: &'a RgbImage, area: Region) -> Self {
        let stride = area.width as usize + 1;
        let cells = stride * (area.height as usize + 1);
        let mut sum = vec![[0u64; 3]; cells];
        let mut sq = vec![[0u64; 3]; cells];

        for y in 0..area.height as usize {
            let mut row_sum = [0u64; 3];
            let mut row_sq = [0u64; 3];
            for x in 0..area.width as usize {
                let pixel = image.get_pixel(area.x + x as u32, area.y + y as u32);
                let below = (y + 1) * stride + x + 1;
                let above = y * stride + x + 1;
                for c in 0..3 {
                    let v = pixel.0[c] as u64;
                    row_sum[c] += v;
                    row_sq[c] += v * v;
                    sum[below][c] = sum[above][c] + row_sum[c];
                    sq[below][c] = sq[above][c] + row_sq[c];
                }
            }
        }

        Self {
            image,
            area,
            sum,
            sq,
        }
    }

    pub fn area(&self) -> Region {
        self.area
    }

    fn window(table: &[[u64; 3]], stride: usize, x: u32, y: u32, w: u32, h: u32) -> [f64; 3] {
        let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
        let a = table[y * stride + x];
        let b = table[y * stride + x + w];
        let c = table[(y + h) * stride + x];
        let d = table[(y + h) * stride + x + w];
        [0, 1, 2].map(|i| ((d[i] + a[i]) - (b[i] + c[i])) as f64)
    }

    /// Correlation of `template` placed at (`dx`, `dy`) inside the area.
    pub fn score(&self, template: &PreparedTemplate, dx: u32, dy: u32) -> f64 {
        let (tw, th) = template.dimensions();
        let stride = self.area.width as usize + 1;
        let count = tw as f64 * th as f64;

        let sums = Self::window(&self.sum, stride, dx, dy, tw, th);
        let squares = Self::window(&self.sq, stride, dx, dy, tw, th);
        let window_energy: f64 = (0..3)
            .map(|c| (squares[c] - sums[c] * sums[c] / count).max(0.0))
            .sum();

        let denominator = (template.norm_sq * window_energy).sqrt();
        if denominator < FLAT_EPSILON {
            return 0.0;
        }

        let raw = self.image.as_raw();
        let image_stride = self.image.width() as usize * 3;
        let left = (self.area.x + dx) as usize * 3;
        let top = (self.area.y + dy) as usize;

        // The template is zero-mean, so the window mean drops out of the cross term.
        let mut numerator = 0.0;
        for ty in 0..th as usize {
            let row_start = (top + ty) * image_stride + left;
            let row = &raw[row_start..row_start + tw as usize * 3];
            let t_row = &template.centered[ty * tw as usize..(ty + 1) * tw as usize];
            for (pixel, t) in row.chunks_exact(3).zip(t_row) {
                numerator +=
                    t[0] * pixel[0] as f64 + t[1] * pixel[1] as f64 + t[2] * pixel[2] as f64;
            }
        }

        (numerator / denominator).clamp(-1.0, 1.0)
    }

    /// Number of valid placements along each axis.
    pub fn placements(&self, template: &PreparedTemplate) -> (u32, u32) {
        let (tw, th) = template.dimensions();
        (
            self.area.width.saturating_sub(tw) + 1,
            self.area.height.saturating_sub(th) + 1,
        )
    }

    /// Best placement with `x0 <= dx <= x1` and `y0 <= dy <= y1`.
    pub fn best_in(
        &self,
        template: &PreparedTemplate,
        (x0, x1): (u32, u32),
        (y0, y1): (u32, u32),
    ) -> Option<Scored> {
        let mut best: Option<Scored> = None;
        for dy in y0..=y1 {
            for dx in x0..=x1 {
                let candidate = Scored {
                    score: self.score(template, dx, dy),
                    x: dx,
                    y: dy,
                };
                if best.map_or(true, |b| candidate.beats(&b)) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Every placement with its score, row-major.
    pub fn score_all(&self, template: &PreparedTemplate) -> Vec<Scored> {
        let (nx, ny) = self.placements(template);
        let mut scores = Vec::with_capacity(nx as usize * ny as usize);
        for dy in 0..ny {
            for dx in 0..nx {
                scores.push(Scored {
                    score: self.score(template, dx, dy),
                    x: dx,
                    y: dy,
                });
            }
        }
        scores
    }

    /// Keeps the `count` best entries, best first.
    pub fn top(mut scores: Vec<Scored>, count: usize) -> Vec<Scored> {
        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then((a.y, a.x).cmp(&(b.y, b.x)))
        });
        scores.truncate(count);
        scores
    }
}
