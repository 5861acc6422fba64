/// Output strategy for single-pyramid runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyramidPlan {
    /// One processed level, written as a plain single-page file
    Single,

    /// All processed levels in one multi-page file, finest first
    MultiPage,

    /// Writer cannot hold several pages: keep only the finest level
    Fallback,
}

impl PyramidPlan {
    pub fn choose(level_count: usize, writer_supports_pages: bool) -> Self {
        match (level_count, writer_supports_pages) {
            (0 | 1, _) => PyramidPlan::Single,
            (_, true) => PyramidPlan::MultiPage,
            (_, false) => PyramidPlan::Fallback,
        }
    }
}
