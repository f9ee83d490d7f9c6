//! Fixed-size pages over a filtered list.

use std::num::NonZeroUsize;

/// Default number of products per page.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(12) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// A list split into pages of `page_size`. The last page may be short.
#[derive(Debug, Clone, Copy)]
pub struct Pages<'a, T> {
    items: &'a [T],
    page_size: NonZeroUsize,
}

/// Split `items` into pages.
#[must_use]
pub const fn paginate<T>(items: &[T], page_size: NonZeroUsize) -> Pages<'_, T> {
    Pages { items, page_size }
}

impl<'a, T> Pages<'a, T> {
    /// `ceil(len / page_size)`; zero for an empty list.
    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.page_size.get())
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// The 1-based page `n`. Pages outside `1..=page_count` are empty.
    #[must_use]
    pub fn page(&self, n: usize) -> &'a [T] {
        n.checked_sub(1)
            .and_then(|index| self.items.chunks(self.page_size.get()).nth(index))
            .unwrap_or(&[])
    }

    /// Clamp a requested page number into the valid range.
    #[must_use]
    pub fn clamp_page(&self, n: usize) -> usize {
        n.clamp(1, self.page_count().max(1))
    }

    /// Every page in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [T]> + use<'a, T> {
        self.items.chunks(self.page_size.get())
    }
}
