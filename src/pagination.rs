use crate::models::Page;

/// Splits `count` ordered items into fixed-size pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self { count, per_page: per_page.max(1) }
    }

    /// Always at least one page, even when there is nothing to show.
    pub fn num_pages(&self) -> usize {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    /// Resolves a raw `?page=` value. Missing or non-numeric input yields the
    /// first page; numbers outside `1..=num_pages` clamp to the last page.
    pub fn page_number(&self, raw: Option<&str>) -> usize {
        let Some(raw) = raw.map(str::trim) else { return 1 };
        match raw.parse::<i64>() {
            // integer syntax too large for i64 is still just out of range
            Err(_) if is_integer(raw) => self.num_pages(),
            Err(_) => 1,
            Ok(n) if n < 1 || n as u64 > self.num_pages() as u64 => self.num_pages(),
            Ok(n) => n as usize,
        }
    }

    pub fn offset(&self, number: usize) -> usize {
        number.saturating_sub(1) * self.per_page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn page<T>(&self, number: usize, items: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        Page {
            items,
            number,
            num_pages,
            per_page: self.per_page,
            count: self.count,
            has_next: number < num_pages,
            has_previous: number > 1,
        }
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').or_else(|| raw.strip_prefix('+')).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
