use image::{GrayImage, Luma};

/// Stored value of a tissue cell.
pub const TISSUE: u8 = 1;

/// Stored value of a background cell.
pub const BACKGROUND: u8 = 0;

/// Two-valued tissue/background grid.
///
/// Cells hold only [`TISSUE`] or [`BACKGROUND`]; every constructor enforces
/// this, so downstream code never sees a third value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    grid: GrayImage,
}

impl BinaryMask {
    /// All-background mask.
    pub fn new_background(width: u32, height: u32) -> Self {
        Self {
            grid: GrayImage::from_pixel(width, height, Luma([BACKGROUND])),
        }
    }

    /// All-tissue mask.
    pub fn new_tissue(width: u32, height: u32) -> Self {
        Self {
            grid: GrayImage::from_pixel(width, height, Luma([TISSUE])),
        }
    }

    /// Mask whose cell `(x, y)` is tissue when `f(x, y)` is true.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self {
            grid: GrayImage::from_fn(width, height, |x, y| {
                Luma([if f(x, y) { TISSUE } else { BACKGROUND }])
            }),
        }
    }

    /// Treat any non-zero cell of a grayscale image as tissue.
    pub fn from_gray(gray: &GrayImage) -> Self {
        Self::from_fn(gray.width(), gray.height(), |x, y| gray.get_pixel(x, y)[0] != 0)
    }

    pub fn width(&self) -> u32 {
        self.grid.width()
    }

    pub fn height(&self) -> u32 {
        self.grid.height()
    }

    /// `(width, height)` of the grid.
    pub fn dimensions(&self) -> (u32, u32) {
        self.grid.dimensions()
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_tissue(&self, x: u32, y: u32) -> bool {
        self.grid.get_pixel(x, y)[0] == TISSUE
    }

    pub fn set(&mut self, x: u32, y: u32, tissue: bool) {
        self.grid
            .put_pixel(x, y, Luma([if tissue { TISSUE } else { BACKGROUND }]));
    }

    pub fn tissue_count(&self) -> u64 {
        self.grid.as_raw().iter().filter(|&&v| v == TISSUE).count() as u64
    }

    /// Raw row-major cells (0 or 1).
    pub fn as_raw(&self) -> &[u8] {
        self.grid.as_raw()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.grid
    }

    /// Printable rendering: tissue black (0), background white (255).
    pub fn to_png_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([if self.is_tissue(x, y) { 0 } else { 255 }])
        })
    }
}
