// downsize/src/processors/resizer.rs
use crate::core::{ResizeAlgorithm, ResizePlan};
use image::{imageops::FilterType, DynamicImage};

/// Decides the output dimensions for an image bounded by `max_size`.
///
/// Images that already fit get the identity plan. Otherwise the longer side
/// becomes `max_size` and the other side is scaled by the same ratio,
/// truncated toward zero. Square images take the height-limited branch.
pub fn compute_resize_plan(width: u32, height: u32, max_size: u32) -> ResizePlan {
    let identity = ResizePlan {
        target_width: width,
        target_height: height,
        needs_resize: false,
    };

    if width == 0 || height == 0 || max_size == 0 {
        return identity;
    }

    if width <= max_size && height <= max_size {
        return identity;
    }

    let aspect_ratio = width as f64 / height as f64;

    let (target_width, target_height) = if width > height {
        (max_size, (max_size as f64 / aspect_ratio) as u32)
    } else {
        ((max_size as f64 * aspect_ratio) as u32, max_size)
    };

    ResizePlan {
        target_width: target_width.max(1),
        target_height: target_height.max(1),
        needs_resize: true,
    }
}

pub struct Resizer {
    algorithm: ResizeAlgorithm,
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn apply(&self, image: &DynamicImage, plan: &ResizePlan) -> DynamicImage {
        if !plan.needs_resize
            || (plan.target_width == image.width() && plan.target_height == image.height())
        {
            log::debug!("Image dimensions unchanged, skipping resize");
            return image.clone();
        }

        log::debug!(
            "Resizing image from {}x{} to {}x{} ({:?})",
            image.width(),
            image.height(),
            plan.target_width,
            plan.target_height,
            self.algorithm
        );

        image.resize_exact(plan.target_width, plan.target_height, self.filter_type())
    }

    fn filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new(ResizeAlgorithm::Lanczos3)
    }
}
