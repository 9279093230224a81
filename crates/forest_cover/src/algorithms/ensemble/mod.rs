//! Ensemble forest classification.
//!
//! Eight vegetation detectors run independently over the image, each scored by its coverage of
//! the interior. Three fusion strategies combine them with different inclusion filters, the
//! best fusion is picked with a penalty on over-inclusive results, and the winner is cleaned up
//! morphologically and restricted to the interior.

pub mod methods;

pub use methods::VegetationMethod;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use tracing::{debug, info};

use crate::{
    algorithms::{features::FeatureChannels, masks},
    config::EnsembleConfig,
    error::{ForestError, Result},
    traits::{DiagnosticsSink, ForestClassifier},
    types::InteriorMask,
};

/// Ways of combining method masks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize,
    Display, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FusionStrategy {
    Weighted,
    UnionTop,
    MajorityEnhanced,
}

#[derive(Debug, Clone)]
pub struct MethodResult {
    pub method: VegetationMethod,
    /// Detector output, zero outside the interior
    pub mask: GrayImage,
    /// Percent of interior pixels set in `mask`
    pub coverage: f64,
}

#[derive(Debug, Clone)]
pub struct FusionResult {
    pub strategy: FusionStrategy,
    pub mask: GrayImage,
    pub coverage: f64,
}

/// Everything the classifier produced for one image
#[derive(Debug, Clone)]
pub struct ForestClassification {
    pub methods: Vec<MethodResult>,
    pub fusions: Vec<FusionResult>,
    pub selected: FusionStrategy,
    /// Coverage of the selected fusion before cleanup
    pub selected_coverage: f64,
    /// Cleaned mask, zero outside the interior
    pub final_mask: GrayImage,
    pub final_coverage: f64,
}

/// Diagnostics key of the `index`-th method, e.g. `3_lab_green`
pub fn method_key(index: usize, method: VegetationMethod) -> String {
    format!("{}_{}", index + 1, method)
}

/// Index of the best candidate. Coverage above `penalty_coverage` is scored at
/// `coverage * penalty_factor`; on equal scores the earliest candidate wins.
pub fn select_by_coverage(coverages: &[f64], penalty_coverage: f64, penalty_factor: f64) -> Option<usize> {
    let score = |coverage: f64| {
        if coverage > penalty_coverage {
            coverage * penalty_factor
        } else {
            coverage
        }
    };

    let mut best: Option<(usize, f64)> = None;
    for (i, &coverage) in coverages.iter().enumerate() {
        let s = score(coverage);
        if best.map_or(true, |(_, top)| s > top) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i)
}

/// Weighted, union and majority fusion over eight color/index/texture detectors
#[derive(Debug, Clone, Default)]
pub struct EnsembleForestClassifier {
    pub config: EnsembleConfig,
}

impl EnsembleForestClassifier {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    /// Run every method in order, restrict it to the interior and score it
    pub fn evaluate_methods(&self, features: &FeatureChannels, interior: &GrayImage) -> Vec<MethodResult> {
        VegetationMethod::iter()
            .map(|method| {
                let mask = masks::intersect(&method.detect(features, &self.config.thresholds), interior);
                let coverage = masks::coverage_percent(&mask, interior);
                debug!("{}: {:.1}% coverage", method.label(), coverage);
                MethodResult { method, mask, coverage }
            })
            .collect()
    }

    /// Pixels where the weight of agreeing qualified methods reaches the vote fraction of the
    /// total qualified weight. Empty when no method qualifies.
    pub fn weighted_vote(&self, methods: &[MethodResult], width: u32, height: u32) -> GrayImage {
        let cfg = &self.config;
        let qualified: Vec<(&MethodResult, f64)> = methods
            .iter()
            .filter(|m| cfg.weighted_band.admits(m.coverage))
            .map(|m| (m, cfg.weights.weight(m.method)))
            .collect();

        let total_weight: f64 = qualified.iter().map(|(_, w)| w).sum();
        if qualified.is_empty() || total_weight <= 0.0 {
            return GrayImage::new(width, height);
        }

        let threshold = total_weight * cfg.weighted_vote_fraction;
        masks::from_predicate(width, height, |x, y| {
            let votes: f64 = qualified
                .iter()
                .filter(|(m, _)| m.mask.get_pixel(x, y)[0] != 0)
                .map(|(_, w)| w)
                .sum();
            votes >= threshold
        })
    }

    /// Logical OR of the highest-coverage methods above the union floor
    pub fn union_top(&self, methods: &[MethodResult], width: u32, height: u32) -> GrayImage {
        let cfg = &self.config;
        let mut ranked: Vec<&MethodResult> = methods.iter().collect();
        // stable: equal coverage keeps evaluation order
        ranked.sort_by(|a, b| b.coverage.total_cmp(&a.coverage));

        let mut union = GrayImage::new(width, height);
        for method in ranked
            .into_iter()
            .take(cfg.union_top_k)
            .filter(|m| m.coverage > cfg.union_min_coverage)
        {
            masks::union_into(&mut union, &method.mask);
        }
        union
    }

    /// Unweighted vote among methods in the majority band; reuses `weighted` when too few qualify
    pub fn majority_vote(&self, methods: &[MethodResult], weighted: &GrayImage) -> GrayImage {
        let cfg = &self.config;
        let qualified: Vec<&MethodResult> = methods
            .iter()
            .filter(|m| cfg.majority_band.admits(m.coverage))
            .collect();

        if qualified.len() < cfg.majority_min_methods {
            debug!(
                "Only {} methods qualify for majority voting; reusing weighted result",
                qualified.len()
            );
            return weighted.clone();
        }

        let threshold = cfg
            .majority_min_votes
            .max(cfg.majority_vote_fraction * qualified.len() as f64);
        let (width, height) = weighted.dimensions();
        masks::from_predicate(width, height, |x, y| {
            let votes = qualified.iter().filter(|m| m.mask.get_pixel(x, y)[0] != 0).count();
            votes as f64 >= threshold
        })
    }

    /// All three fusions, in a fixed order
    pub fn fuse(&self, methods: &[MethodResult], interior: &GrayImage) -> Vec<FusionResult> {
        let (width, height) = interior.dimensions();
        let weighted = self.weighted_vote(methods, width, height);
        let union = self.union_top(methods, width, height);
        let majority = self.majority_vote(methods, &weighted);

        [
            (FusionStrategy::Weighted, weighted),
            (FusionStrategy::UnionTop, union),
            (FusionStrategy::MajorityEnhanced, majority),
        ]
        .into_iter()
        .map(|(strategy, mask)| {
            let coverage = masks::coverage_percent(&mask, interior);
            info!("{} fusion: {:.1}% coverage", strategy, coverage);
            FusionResult { strategy, mask, coverage }
        })
        .collect()
    }

    /// Opening, closing and median smoothing, then restriction to the interior
    pub fn postprocess(&self, mask: &GrayImage, interior: &GrayImage) -> GrayImage {
        let cfg = &self.config;
        let mut cleaned = mask.clone();
        morphology::open_mut(&mut cleaned, Norm::L1, cfg.cleanup_open_radius);
        morphology::close_mut(&mut cleaned, Norm::L2, cfg.cleanup_close_radius);
        let smoothed = median_filter(&cleaned, cfg.median_radius, cfg.median_radius);
        masks::intersect(&smoothed, interior)
    }
}

impl ForestClassifier for EnsembleForestClassifier {
    fn classify(
        &self,
        features: &FeatureChannels,
        interior: &InteriorMask,
        diagnostics: &mut dyn DiagnosticsSink,
    ) -> Result<ForestClassification> {
        if features.dimensions() != interior.mask.dimensions() {
            return Err(ForestError::DimensionMismatch {
                expected: features.dimensions(),
                actual: interior.mask.dimensions(),
            });
        }
        let cfg = &self.config;

        let methods = self.evaluate_methods(features, &interior.mask);
        let fusions = self.fuse(&methods, &interior.mask);

        let coverages: Vec<f64> = fusions.iter().map(|f| f.coverage).collect();
        let index = select_by_coverage(&coverages, cfg.penalty_coverage, cfg.penalty_factor).unwrap_or(0);
        let chosen = &fusions[index];
        info!("Selected {} fusion ({:.1}% coverage)", chosen.strategy, chosen.coverage);

        let final_mask = self.postprocess(&chosen.mask, &interior.mask);
        let final_coverage = masks::coverage_percent(&final_mask, &interior.mask);
        info!("Final forest coverage: {:.1}%", final_coverage);

        if diagnostics.wants_masks() {
            for (i, result) in methods.iter().enumerate() {
                diagnostics.record_mask(&method_key(i, result.method), &result.mask);
            }
            for fusion in &fusions {
                let name: &'static str = fusion.strategy.into();
                diagnostics.record_mask(name, &fusion.mask);
            }
            diagnostics.record_mask("selected", &chosen.mask);
            diagnostics.record_mask("final", &final_mask);
        }

        Ok(ForestClassification {
            selected: chosen.strategy,
            selected_coverage: chosen.coverage,
            methods,
            fusions,
            final_mask,
            final_coverage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{MaskCollector, NoDiagnostics};
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn full_interior(width: u32, height: u32) -> InteriorMask {
        InteriorMask {
            mask: GrayImage::from_pixel(width, height, Luma([masks::ON])),
            pixel_count: width as u64 * height as u64,
            coverage_fraction: 1.0,
            repaired: false,
        }
    }

    fn result(method: VegetationMethod, coverage: f64, mask: GrayImage) -> MethodResult {
        MethodResult { method, mask, coverage }
    }

    #[test]
    fn test_penalty_prefers_moderate_coverage() {
        // 95% scores 47.5 and loses to 60%
        assert_eq!(select_by_coverage(&[60.0, 95.0, 30.0], 80.0, 0.5), Some(0));
        // 80% itself is not penalized
        assert_eq!(select_by_coverage(&[80.0, 70.0], 80.0, 0.5), Some(0));
        assert_eq!(select_by_coverage(&[99.0, 45.0], 80.0, 0.5), Some(0));
        assert_eq!(select_by_coverage(&[99.0, 50.0], 80.0, 0.5), Some(1));
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        assert_eq!(select_by_coverage(&[0.0, 0.0, 0.0], 80.0, 0.5), Some(0));
        assert_eq!(select_by_coverage(&[], 80.0, 0.5), None);
    }

    #[test]
    fn test_weighted_vote_without_qualified_methods_is_empty() {
        let classifier = EnsembleForestClassifier::default();
        let full = GrayImage::from_pixel(4, 4, Luma([255]));
        let methods = vec![
            result(VegetationMethod::HsvEnhanced, 100.0, full.clone()),
            result(VegetationMethod::LabGreen, 1.0, full),
        ];
        assert_eq!(masks::count_set(&classifier.weighted_vote(&methods, 4, 4)), 0);
    }

    #[test]
    fn test_weighted_vote_threshold() {
        let classifier = EnsembleForestClassifier::default();
        let left = masks::from_predicate(10, 1, |x, _| x < 5);
        let right = masks::from_predicate(10, 1, |x, _| x >= 5);
        // HSV 1.5 on the left, Green Dominance 1.2 on the right: threshold 0.4 * 2.7 = 1.08
        let methods = vec![
            result(VegetationMethod::HsvEnhanced, 50.0, left),
            result(VegetationMethod::GreenDominance, 50.0, right),
        ];
        assert_eq!(masks::count_set(&classifier.weighted_vote(&methods, 10, 1)), 10);

        // Texture 0.8 alone on the right falls below 0.4 * 2.3 = 0.92
        let mut methods = methods;
        methods[1].method = VegetationMethod::Texture;
        let mask = classifier.weighted_vote(&methods, 10, 1);
        assert_eq!(masks::count_set(&mask), 5);
        assert_eq!(mask.get_pixel(0, 0)[0], masks::ON);
    }

    #[test]
    fn test_union_takes_top_methods_above_floor() {
        let classifier = EnsembleForestClassifier::default();
        let column = |i: u32| masks::from_predicate(10, 1, move |x, _| x == i);
        let methods: Vec<MethodResult> = VegetationMethod::iter()
            .enumerate()
            .map(|(i, method)| result(method, 5.0 + 5.0 * i as f64, column(i as u32)))
            .collect();
        // coverages 5..40: top five are indices 7..3, all above 10
        let union = classifier.union_top(&methods, 10, 1);
        assert_eq!(masks::count_set(&union), 5);
        assert_eq!(union.get_pixel(3, 0)[0], masks::ON);
        assert_eq!(union.get_pixel(2, 0)[0], 0);
    }

    #[test]
    fn test_majority_falls_back_to_weighted() {
        let classifier = EnsembleForestClassifier::default();
        let weighted = masks::from_predicate(4, 4, |x, _| x == 0);
        let methods = vec![
            result(VegetationMethod::HsvEnhanced, 50.0, GrayImage::from_pixel(4, 4, Luma([255]))),
            result(VegetationMethod::LabGreen, 50.0, GrayImage::from_pixel(4, 4, Luma([255]))),
        ];
        assert_eq!(classifier.majority_vote(&methods, &weighted), weighted);
    }

    #[test]
    fn test_majority_needs_two_votes() {
        let classifier = EnsembleForestClassifier::default();
        let methods = vec![
            result(VegetationMethod::HsvEnhanced, 50.0, masks::from_predicate(3, 1, |x, _| x == 0)),
            result(VegetationMethod::LabGreen, 50.0, masks::from_predicate(3, 1, |x, _| x <= 1)),
            result(VegetationMethod::DarkGreen, 50.0, masks::from_predicate(3, 1, |x, _| x <= 1)),
        ];
        // three qualify: threshold max(2, 1.05) = 2
        let mask = classifier.majority_vote(&methods, &GrayImage::new(3, 1));
        assert_eq!(mask.get_pixel(0, 0)[0], masks::ON);
        assert_eq!(mask.get_pixel(1, 0)[0], masks::ON);
        assert_eq!(mask.get_pixel(2, 0)[0], 0);
    }

    #[test]
    fn test_no_vegetation_gives_empty_forest() {
        let image = RgbImage::from_pixel(40, 40, Rgb([100, 100, 100]));
        let features = FeatureChannels::extract(&image);
        let classification = EnsembleForestClassifier::default()
            .classify(&features, &full_interior(40, 40), &mut NoDiagnostics)
            .unwrap();

        assert_eq!(classification.selected, FusionStrategy::Weighted);
        assert_eq!(classification.final_coverage, 0.0);
        assert!(classification.methods.iter().all(|m| m.coverage == 0.0));
    }

    #[test]
    fn test_green_block_is_classified() {
        let mut image = RgbImage::from_pixel(80, 80, Rgb([100, 100, 100]));
        draw_filled_rect_mut(&mut image, Rect::at(0, 0).of_size(40, 80), Rgb([34, 139, 34]));
        let features = FeatureChannels::extract(&image);

        let mut collector = MaskCollector::default();
        let classification = EnsembleForestClassifier::default()
            .classify(&features, &full_interior(80, 80), &mut collector)
            .unwrap();

        for method in &classification.methods {
            assert!((0.0..=100.0).contains(&method.coverage));
        }
        for fusion in &classification.fusions {
            assert!((0.0..=100.0).contains(&fusion.coverage));
        }
        assert!((classification.final_coverage - 50.0).abs() < 2.0);
        assert_eq!(classification.final_mask.get_pixel(10, 40)[0], masks::ON);
        assert_eq!(classification.final_mask.get_pixel(70, 40)[0], 0);

        assert_eq!(collector.len(), 8 + 3 + 2);
        let names: Vec<&str> = collector.names().collect();
        assert_eq!(names[0], "1_hsv_enhanced");
        assert_eq!(names[7], "8_dark_green");
        assert!(collector.get("majority_enhanced").is_some());
        assert!(collector.get("final").is_some());
    }

    #[test]
    fn test_final_mask_stays_inside_interior() {
        let image = RgbImage::from_pixel(60, 60, Rgb([34, 139, 34]));
        let features = FeatureChannels::extract(&image);
        let mut interior = full_interior(60, 60);
        interior.mask = masks::from_predicate(60, 60, |x, y| (10..50).contains(&x) && (10..50).contains(&y));
        interior.pixel_count = 1600;

        let classification = EnsembleForestClassifier::default()
            .classify(&features, &interior, &mut NoDiagnostics)
            .unwrap();
        assert_eq!(classification.final_mask.get_pixel(5, 5)[0], 0);
        assert_eq!(classification.final_coverage, 100.0);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let features = FeatureChannels::extract(&RgbImage::new(10, 10));
        let err = EnsembleForestClassifier::default()
            .classify(&features, &full_interior(5, 5), &mut NoDiagnostics)
            .unwrap_err();
        assert!(matches!(err, ForestError::DimensionMismatch { .. }));
    }
}
