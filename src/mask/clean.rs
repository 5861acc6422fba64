use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use super::types::BinaryMask;

/// Remove small tissue specks and fill small background holes.
///
/// 1. Tissue components (8-connected) smaller than `min_area` become
///    background.
/// 2. Background components (4-connected) smaller than `min_area` that do
///    not touch the border become tissue.
///
/// Pairing 8-connectivity for tissue with 4-connectivity for background
/// keeps the two passes from undoing each other, so cleaning twice gives
/// the same result as cleaning once.
pub fn clean(mask: &BinaryMask, min_area: u32) -> BinaryMask {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }

    let tissue = mask.as_gray();
    let specks = small_components(tissue, Connectivity::Eight, min_area, false);
    let despeckled = BinaryMask::from_fn(width, height, |x, y| {
        mask.is_tissue(x, y) && !specks.contains(x, y)
    });

    let inverted = GrayImage::from_fn(width, height, |x, y| {
        Luma([u8::from(!despeckled.is_tissue(x, y))])
    });
    let holes = small_components(&inverted, Connectivity::Four, min_area, true);

    BinaryMask::from_fn(width, height, |x, y| {
        despeckled.is_tissue(x, y) || holes.contains(x, y)
    })
}

/// Cells belonging to non-zero components smaller than `min_area`.
struct ComponentSelection {
    labels: image::ImageBuffer<Luma<u32>, Vec<u32>>,
    selected: Vec<bool>,
}

impl ComponentSelection {
    fn contains(&self, x: u32, y: u32) -> bool {
        let label = self.labels.get_pixel(x, y)[0] as usize;
        label != 0 && self.selected[label]
    }
}

fn small_components(
    grid: &GrayImage,
    connectivity: Connectivity,
    min_area: u32,
    skip_border: bool,
) -> ComponentSelection {
    let labels = connected_components(grid, connectivity, Luma([0u8]));
    let (width, height) = labels.dimensions();

    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut sizes = vec![0u64; max_label + 1];
    let mut touches_border = vec![false; max_label + 1];

    for (x, y, p) in labels.enumerate_pixels() {
        let label = p[0] as usize;
        if label == 0 {
            continue;
        }
        sizes[label] += 1;
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            touches_border[label] = true;
        }
    }

    let selected = sizes
        .iter()
        .zip(&touches_border)
        .enumerate()
        .map(|(label, (&size, &border))| {
            label != 0 && size < min_area as u64 && !(skip_border && border)
        })
        .collect();

    ComponentSelection { labels, selected }
}
