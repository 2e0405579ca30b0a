use std::collections::BTreeSet;

/// Cartesian product of `lists`, varying the last list fastest.
///
/// An empty outer slice yields one empty combination; an empty inner list yields none.
pub fn cartesian_product<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    lists.iter().fold(vec![Vec::new()], |acc, list| {
        acc.iter()
            .flat_map(|prefix| {
                list.iter().map(move |item| {
                    let mut combination = prefix.clone();
                    combination.push(item.clone());
                    combination
                })
            })
            .collect()
    })
}

/// Every sequence of `repeat` items drawn from `items` with replacement, in lexicographic order
/// of positions.
pub fn product_repeat<T: Clone>(items: &[T], repeat: usize) -> Vec<Vec<T>> {
    cartesian_product(&vec![items.to_vec(); repeat])
}

/// Removes later duplicates, keeping the first occurrence of every item.
pub fn dedup_preserving_order<T: Clone + Ord>(items: &[T]) -> Vec<T> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .filter(|item| seen.insert((*item).clone()))
        .cloned()
        .collect()
}
