use image::imageops::{self, FilterType};
use serde::Serialize;

use crate::common::{Frame, Point, Region, Size};
use crate::error::MatchError;
use crate::vision::config::MatchConfig;
use crate::vision::correlation::{PreparedTemplate, Scored, SearchArea};
use crate::vision::template_store::Template;

/// Outcome of one template search, always in full-frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub found: bool,
    pub score: f64,
    pub location: Option<Point>,
    pub size: Option<Size>,
}

impl MatchResult {
    pub fn not_found() -> Self {
        Self {
            found: false,
            score: 0.0,
            location: None,
            size: None,
        }
    }

    /// Centre of the matched box, integer-truncated.
    pub fn center(&self) -> Option<Point> {
        let location = self.location?;
        let size = self.size?;
        Some(Point::new(
            location.x + size.width / 2,
            location.y + size.height / 2,
        ))
    }
}

pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn accepts(&self, score: f64) -> bool {
        score >= self.config.threshold
    }

    pub fn match_template(
        &self,
        frame: &Frame,
        template: &Template,
        region: Option<Region>,
    ) -> Result<MatchResult, MatchError> {
        let area = match region {
            Some(region) if !region.fits_within(frame.width(), frame.height()) => {
                return Err(MatchError::RegionOutOfBounds {
                    region,
                    width: frame.width(),
                    height: frame.height(),
                });
            }
            Some(region) => region,
            None => Region::full_image(frame.width(), frame.height()),
        };
        if area.width == 0 || area.height == 0 {
            return Err(MatchError::EmptyArea);
        }
        let size = template.size();
        if size.width == 0 || size.height == 0 || size.width > area.width || size.height > area.height
        {
            return Err(MatchError::TemplateTooLarge {
                template_width: size.width,
                template_height: size.height,
                area_width: area.width,
                area_height: area.height,
            });
        }

        let best = self.locate(frame, area, template);
        let found = self.accepts(best.score);
        tracing::debug!(
            "Best score {:.4} for {} at ({}, {}) in {}",
            best.score,
            template.path().display(),
            area.x + best.x,
            area.y + best.y,
            area
        );

        Ok(MatchResult {
            found,
            score: best.score,
            location: found.then(|| Point::new(area.x + best.x, area.y + best.y)),
            size: found.then_some(size),
        })
    }

    // Coarse levels worth using for this search, 0 meaning exhaustive.
    fn pyramid_levels(&self, template: Size, area: Region) -> u32 {
        let placements = (area.width - template.width + 1) as u64
            * (area.height - template.height + 1) as u64;
        let cost = placements * template.width as u64 * template.height as u64;
        if cost <= self.config.exhaustive_budget {
            return 0;
        }
        let shorter = template.width.min(template.height);
        let mut levels = 0;
        while levels < self.config.max_pyramid_levels
            && (shorter >> (levels + 1)) >= self.config.min_coarse_side
        {
            levels += 1;
        }
        levels
    }

    fn locate(&self, frame: &Frame, area: Region, template: &Template) -> Scored {
        let size = template.size();
        let full = SearchArea::new(frame.image(), area);
        let (nx, ny) = full.placements(template.prepared());
        let everywhere = ((0, nx - 1), (0, ny - 1));

        let exhaustive = || {
            full.best_in(template.prepared(), everywhere.0, everywhere.1)
                .unwrap_or(Scored { score: 0.0, x: 0, y: 0 })
        };

        let levels = self.pyramid_levels(size, area);
        if levels == 0 {
            return exhaustive();
        }

        let factor = 1u32 << levels;
        let cropped = imageops::crop_imm(frame.image(), area.x, area.y, area.width, area.height)
            .to_image();
        let coarse_image = imageops::resize(
            &cropped,
            area.width / factor,
            area.height / factor,
            FilterType::Triangle,
        );
        let coarse_template = PreparedTemplate::new(&imageops::resize(
            template.image(),
            size.width / factor,
            size.height / factor,
            FilterType::Triangle,
        ));
        let coarse = SearchArea::new(
            &coarse_image,
            Region::full_image(coarse_image.width(), coarse_image.height()),
        );
        let candidates = SearchArea::top(
            coarse.score_all(&coarse_template),
            self.config.coarse_candidates,
        );
        tracing::trace!(
            "Refining {} coarse candidates at 1/{} scale",
            candidates.len(),
            factor
        );

        let mut best: Option<Scored> = None;
        for candidate in candidates {
            let x = candidate.x * factor;
            let y = candidate.y * factor;
            let xs = (x.saturating_sub(factor), (x + factor).min(nx - 1));
            let ys = (y.saturating_sub(factor), (y + factor).min(ny - 1));
            if xs.0 > xs.1 || ys.0 > ys.1 {
                continue;
            }
            if let Some(refined) = full.best_in(template.prepared(), xs, ys) {
                let better = best.map_or(true, |b| {
                    refined.score > b.score
                        || (refined.score == b.score && (refined.y, refined.x) < (b.y, b.x))
                });
                if better {
                    best = Some(refined);
                }
            }
        }
        match best {
            Some(best) if self.accepts(best.score) => best,
            // Fine detail can vanish at the coarse scale; only the full search is authoritative.
            _ => {
                tracing::debug!("Coarse pass found no match, searching every position");
                exhaustive()
            }
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}
