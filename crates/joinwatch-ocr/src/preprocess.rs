use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use joinwatch_config::ocr::{PreprocessConfig, Strategy};
use parking_lot::Mutex;
use serde::Serialize;

pub trait Preprocessor {
    fn process(&self, image: &RgbaImage) -> RgbaImage;
}

impl Preprocessor for Strategy {
    /// scale -> grayscale -> contrast -> threshold -> invert
    fn process(&self, image: &RgbaImage) -> RgbaImage {
        if self.is_identity() {
            return image.clone();
        }

        let mut out = if self.scale != 1.0 {
            let width = ((image.width() as f32 * self.scale).round() as u32).max(1);
            let height = ((image.height() as f32 * self.scale).round() as u32).max(1);
            imageops::resize(image, width, height, FilterType::Triangle)
        } else {
            image.clone()
        };

        if self.grayscale {
            out = DynamicImage::ImageLuma8(imageops::grayscale(&out)).to_rgba8();
        }

        if self.contrast != 0.0 {
            out = imageops::contrast(&out, self.contrast);
        }

        if let Some(threshold) = self.threshold {
            for pixel in out.pixels_mut() {
                let [r, g, b, a] = pixel.0;
                let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
                let v = if luma >= threshold as f32 { 255 } else { 0 };
                pixel.0 = [v, v, v, a];
            }
        }

        if self.invert {
            imageops::invert(&mut out);
        }

        out
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StrategyStats {
    pub name: String,
    pub attempts: u64,
    pub successes: u64,
    pub score: f64,
}

#[derive(Default, Clone, Copy)]
struct Tally {
    attempts: u64,
    successes: u64,
}

impl Tally {
    /// Laplace-smoothed success rate, untried strategies start at 0.5
    fn score(&self) -> f64 {
        (self.successes as f64 + 1.0) / (self.attempts as f64 + 2.0)
    }
}

/// Picks the preprocessing strategy with the best observed success rate
pub struct AdaptiveSelector {
    strategies: Vec<Strategy>,
    adaptive: bool,
    tallies: Mutex<Vec<Tally>>,
}

impl AdaptiveSelector {
    pub fn new(config: &PreprocessConfig) -> Self {
        let strategies = if config.strategies.is_empty() {
            vec![Strategy::named("raw")]
        } else {
            config.strategies.clone()
        };

        Self {
            tallies: Mutex::new(vec![Tally::default(); strategies.len()]),
            strategies,
            adaptive: config.adaptive,
        }
    }

    /// Highest score wins, earlier strategies win ties.
    /// Without adaptation the first strategy is always used.
    pub fn choose(&self) -> &Strategy {
        if !self.adaptive {
            return &self.strategies[0];
        }

        let tallies = self.tallies.lock();
        let mut best = 0;
        for (i, tally) in tallies.iter().enumerate().skip(1) {
            if tally.score() > tallies[best].score() {
                best = i;
            }
        }
        &self.strategies[best]
    }

    pub fn report(&self, name: &str, success: bool) {
        let Some(i) = self.strategies.iter().position(|s| s.name == name) else {
            return;
        };

        let mut tallies = self.tallies.lock();
        tallies[i].attempts += 1;
        if success {
            tallies[i].successes += 1;
        }
    }

    pub fn stats(&self) -> Vec<StrategyStats> {
        let tallies = self.tallies.lock();
        self.strategies
            .iter()
            .zip(tallies.iter())
            .map(|(strategy, tally)| StrategyStats {
                name: strategy.name.clone(),
                attempts: tally.attempts,
                successes: tally.successes,
                score: tally.score(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(10, 4, |x, _| {
            if x % 2 == 0 {
                Rgba([200, 200, 200, 255])
            } else {
                Rgba([20, 20, 20, 255])
            }
        })
    }

    #[test]
    fn test_identity_keeps_pixels() {
        let image = checker();
        assert_eq!(Strategy::named("raw").process(&image), image);
    }

    #[test]
    fn test_scale_changes_dimensions() {
        let strategy = Strategy {
            scale: 2.0,
            ..Strategy::named("up")
        };
        let out = strategy.process(&checker());
        assert_eq!(out.dimensions(), (20, 8));
    }

    #[test]
    fn test_threshold_then_invert() {
        let strategy = Strategy {
            threshold: Some(128),
            invert: true,
            ..Strategy::named("bin_inv")
        };
        let out = strategy.process(&checker());
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_selector_follows_success() {
        let selector = AdaptiveSelector::new(&PreprocessConfig::default());
        assert_eq!(selector.choose().name, "raw");

        // raw keeps failing, the next untried strategy takes over
        selector.report("raw", false);
        assert_eq!(selector.choose().name, "upscale_gray");

        selector.report("upscale_gray", false);
        selector.report("binarized", true);
        assert_eq!(selector.choose().name, "binarized");

        let stats = selector.stats();
        assert_eq!(stats.len(), 4);
        assert_eq!(stats[2].successes, 1);
    }

    #[test]
    fn test_fixed_selection_without_adaptation() {
        let config = PreprocessConfig {
            adaptive: false,
            ..PreprocessConfig::default()
        };
        let selector = AdaptiveSelector::new(&config);
        selector.report("raw", false);
        selector.report("raw", false);
        assert_eq!(selector.choose().name, "raw");
    }
}
