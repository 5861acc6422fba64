use std::cmp::Ordering;

use super::types::BinaryMask;

/// Resample a mask onto a `(width, height)` grid by nearest neighbour.
///
/// Target cell `(x, y)` takes the source cell at
/// `round_half_even(x * src_w / width)`, `round_half_even(y * src_h / height)`,
/// clamped to the source grid. An identical shape returns an equal mask.
pub fn scale(mask: &BinaryMask, width: u32, height: u32) -> BinaryMask {
    let (src_w, src_h) = mask.dimensions();
    if (src_w, src_h) == (width, height) {
        return mask.clone();
    }
    if src_w == 0 || src_h == 0 {
        return BinaryMask::new_background(width, height);
    }

    let columns = source_indices(src_w, width);
    let rows = source_indices(src_h, height);

    BinaryMask::from_fn(width, height, |x, y| {
        mask.is_tissue(columns[x as usize], rows[y as usize])
    })
}

/// Exact rational `round_half_even(i * src_len / dst_len)` per target index.
fn source_indices(src_len: u32, dst_len: u32) -> Vec<u32> {
    let (src, dst) = (src_len as u64, dst_len as u64);
    (0..dst)
        .map(|i| {
            let (q, r) = (i * src / dst, i * src % dst);
            let rounded = match (2 * r).cmp(&dst) {
                Ordering::Greater => q + 1,
                Ordering::Equal => q + (q & 1),
                Ordering::Less => q,
            };
            rounded.min(src - 1) as u32
        })
        .collect()
}
