//! Stable sorting driven by a strict-weak-order `less` predicate.
//!
//! Only `less` is ever consulted and every loop is bounded by the input length, so a
//! predicate that is not actually a strict weak ordering yields some permutation of the
//! input rather than a panic or a hang.

/// Runs at or below this length are insertion sorted.
const INSERTION_THRESHOLD: usize = 16;

/// Sorts `items` so that `less` holds between no later element and an earlier one.
///
/// Elements for which neither `less(a, b)` nor `less(b, a)` holds keep their input order.
pub fn stable_sort_by<T, F>(items: Vec<T>, mut less: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> bool,
{
    merge_sort(items, &mut less)
}

fn merge_sort<T, F>(mut items: Vec<T>, less: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> bool,
{
    if items.len() <= INSERTION_THRESHOLD {
        insertion_sort(&mut items, less);
        return items;
    }

    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, less);
    let right = merge_sort(right, less);

    merge_two(left, right, less)
}

fn insertion_sort<T, F>(items: &mut [T], less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && less(&items[j], &items[j - 1]) {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}

// Ties go to `left`, which is what keeps the sort stable.
fn merge_two<T, F>(left: Vec<T>, right: Vec<T>, less: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> bool,
{
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => less(r, l),
            _ => break,
        };

        merged.extend(if take_right { right.next() } else { left.next() });
    }

    merged.extend(left);
    merged.extend(right);
    merged
}

#[cfg(test)]
mod tests {
    use super::stable_sort_by;

    #[test]
    fn sorts_ascending() {
        let items: Vec<i32> = (0..100).rev().collect();
        let sorted = stable_sort_by(items, |a, b| a < b);
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn equal_elements_keep_input_order() {
        // (sort key, original position)
        let items: Vec<(u8, usize)> = (0..200).map(|i| ((i * 7 % 5) as u8, i)).collect();
        let sorted = stable_sort_by(items, |a, b| a.0 < b.0);

        for pair in sorted.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
            if pair[0].0 == pair[1].0 {
                assert!(pair[0].1 < pair[1].1);
            }
        }
    }

    #[test]
    fn inconsistent_predicate_still_returns_a_permutation() {
        let items: Vec<u32> = (0..300).collect();
        let mut calls = 0u32;
        let mut sorted = stable_sort_by(items, |_, _| {
            calls += 1;
            calls % 3 == 0
        });

        sorted.sort_unstable();
        assert_eq!(sorted, (0..300).collect::<Vec<_>>());
    }

    #[test]
    fn empty_and_single() {
        assert!(stable_sort_by(Vec::<i32>::new(), |a, b| a < b).is_empty());
        assert_eq!(stable_sort_by(vec![1], |a, b| a < b), [1]);
    }
}
