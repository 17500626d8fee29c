// Yatube - A blog with groups, comments and author subscriptions
// Copyright (C) 2025 Yatube Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Page-number pagination of ordered listings
//!
//! Page numbers come straight from the client and are never rejected:
//! a missing or non-numeric page means the first page, and a number outside
//! the valid range means the last page.

use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;

/// One page of an ordered listing plus navigation metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in listing order
    pub items: Vec<T>,

    /// 1-based page number
    pub number: usize,

    /// Total number of pages (0 for an empty listing)
    pub num_pages: usize,

    /// Total number of items across all pages
    pub count: usize,

    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,

    /// 1-based index of the first item on this page, 0 when empty
    pub start_index: usize,

    /// 1-based index of the last item on this page, 0 when empty
    pub end_index: usize,
}

#[cfg(test)]
impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Number of pages needed for `count` items
pub fn num_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

/// The integer a raw page parameter names, if any
///
/// Blank and non-integer input gives `None`. Integers too large for `i64`
/// in either direction saturate to `i64::MAX`, which is past every last page.
pub fn requested_number(requested: Option<&str>) -> Option<i64> {
    let raw = requested.map(str::trim).filter(|s| !s.is_empty())?;

    match raw.parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Some(i64::MAX)
        }
        Err(_) => None,
    }
}

/// Turn a raw page parameter into a valid page number
///
/// Returns 1 for an empty listing so the caller always gets a page back.
pub fn resolve_page(requested: Option<&str>, count: usize, page_size: usize) -> usize {
    let last = num_pages(count, page_size).max(1);

    match requested_number(requested) {
        None => 1,
        Some(n) if n >= 1 && (n as u64) <= last as u64 => n as usize,
        Some(_) => last,
    }
}

/// Slice an ordered sequence into the requested page
pub fn paginate<T>(items: Vec<T>, page_size: usize, requested: Option<&str>) -> Page<T> {
    let page_size = page_size.max(1);
    let count = items.len();
    let total = num_pages(count, page_size);
    let number = resolve_page(requested, count, page_size);

    let start = ((number - 1) * page_size).min(count);
    let end = (start + page_size).min(count);

    let page_items: Vec<T> = items.into_iter().skip(start).take(end - start).collect();

    let has_next = number < total;
    let has_previous = number > 1;
    let (start_index, end_index) = if page_items.is_empty() {
        (0, 0)
    } else {
        (start + 1, end)
    };

    Page {
        items: page_items,
        number,
        num_pages: total,
        count,
        has_next,
        has_previous,
        next_page_number: has_next.then_some(number + 1),
        previous_page_number: has_previous.then(|| number - 1),
        start_index,
        end_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleven_items_with_page_size_ten() {
        let items: Vec<u32> = (1..=11).collect();

        let first = paginate(items.clone(), 10, None);
        assert_eq!(first.len(), 10);
        assert_eq!(first.number, 1);
        assert!(first.has_next);
        assert!(!first.has_previous);
        assert_eq!(first.next_page_number, Some(2));

        let second = paginate(items, 10, Some("2"));
        assert_eq!(second.items, vec![11]);
        assert!(!second.has_next);
        assert!(second.has_previous);
        assert_eq!(second.previous_page_number, Some(1));
        assert_eq!((second.start_index, second.end_index), (11, 11));
        assert_eq!(second.count, 11);
    }

    #[test]
    fn pages_reconstruct_the_sequence() {
        for count in 0..=23usize {
            for page_size in 1..=6usize {
                let items: Vec<usize> = (0..count).collect();
                let expected_pages = count.div_ceil(page_size);

                let mut rebuilt = Vec::new();
                for n in 1..=expected_pages {
                    let page = paginate(items.clone(), page_size, Some(&n.to_string()));
                    assert_eq!(page.num_pages, expected_pages);
                    assert_eq!(page.number, n);
                    assert!(page.len() <= page_size);
                    assert!(!page.is_empty());
                    rebuilt.extend(page);
                }

                assert_eq!(rebuilt, items, "count={count} page_size={page_size}");
            }
        }
    }

    #[test]
    fn empty_sequence_gives_empty_first_page() {
        let page = paginate(Vec::<u8>::new(), 10, Some("3"));
        assert_eq!(page.num_pages, 0);
        assert_eq!(page.number, 1);
        assert!(page.is_empty());
        assert!(!page.has_next);
        assert!(!page.has_previous);
        assert_eq!((page.start_index, page.end_index), (0, 0));
    }

    #[test]
    fn garbage_page_numbers_fall_back_to_first_page() {
        for raw in [None, Some(""), Some("  "), Some("abc"), Some("2.5"), Some("1e3")] {
            assert_eq!(resolve_page(raw, 35, 10), 1, "{raw:?}");
        }
        assert_eq!(resolve_page(Some(" 2 "), 35, 10), 2);
        assert_eq!(requested_number(Some("02")), Some(2));
        assert_eq!(requested_number(Some("abc")), None);
        assert_eq!(requested_number(Some("-99999999999999999999")), Some(i64::MAX));
    }

    #[test]
    fn out_of_range_page_numbers_clamp_to_last_page() {
        for raw in ["0", "-3", "5", "99999999999999999999999"] {
            assert_eq!(resolve_page(Some(raw), 35, 10), 4, "{raw}");
        }

        let page = paginate((0..35).collect::<Vec<_>>(), 10, Some("99"));
        assert_eq!(page.number, 4);
        assert_eq!(page.items, vec![30, 31, 32, 33, 34]);
    }
}
