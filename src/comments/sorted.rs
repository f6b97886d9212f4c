//! Key-ordered sequence with left/right insertion and binary search
//!
//! @module comments/sorted

use std::fmt;

/// Sequence kept ordered by a key extracted from each item
pub struct Sorted<T, K> {
    items: Vec<T>,
    keys: Vec<K>,
    key: fn(&T) -> K,
}

impl<T, K: Ord> Sorted<T, K> {
    pub fn new(key: fn(&T) -> K) -> Self {
        Self {
            items: Vec::new(),
            keys: Vec::new(),
            key,
        }
    }

    /// Position before every item whose key equals `key`
    #[inline]
    pub fn bisect_key_left(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k < key)
    }

    /// Position after every item whose key equals `key`
    #[inline]
    pub fn bisect_key_right(&self, key: &K) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    pub fn bisect_left(&self, item: &T) -> usize {
        self.bisect_key_left(&(self.key)(item))
    }

    pub fn bisect_right(&self, item: &T) -> usize {
        self.bisect_key_right(&(self.key)(item))
    }

    /// Insert before existing items with an equal key
    pub fn insert_left(&mut self, item: T) -> usize {
        let key = (self.key)(&item);
        let idx = self.bisect_key_left(&key);
        self.keys.insert(idx, key);
        self.items.insert(idx, item);
        idx
    }

    /// Insert after existing items with an equal key
    pub fn insert_right(&mut self, item: T) -> usize {
        let key = (self.key)(&item);
        let idx = self.bisect_key_right(&key);
        self.keys.insert(idx, key);
        self.items.insert(idx, item);
        idx
    }

    /// First item whose key is exactly `key`
    pub fn find(&self, key: &K) -> Option<&T> {
        let idx = self.bisect_key_left(key);
        match self.keys.get(idx) {
            Some(k) if k == key => self.items.get(idx),
            _ => None,
        }
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T, K: Ord> IntoIterator for &'a Sorted<T, K> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, K> fmt::Debug for Sorted<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_first(item: &(u32, &'static str)) -> u32 {
        item.0
    }

    #[test]
    fn test_keys_stay_ordered() {
        let mut s = Sorted::new(by_first);
        for (i, k) in [5u32, 1, 9, 3, 3, 7, 0, 9].into_iter().enumerate() {
            if i % 2 == 0 {
                s.insert_left((k, "l"));
            } else {
                s.insert_right((k, "r"));
            }
        }

        let keys: Vec<u32> = s.iter().map(|i| i.0).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(s.len(), 8);
    }

    #[test]
    fn test_tie_breaking() {
        let mut s = Sorted::new(by_first);
        s.insert_right((1, "a"));
        s.insert_right((1, "b"));
        s.insert_left((1, "c"));

        let names: Vec<&str> = s.iter().map(|i| i.1).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(s.find(&1).unwrap().1, "c");
        assert_eq!(s.bisect_left(&(1, "")), 0);
        assert_eq!(s.bisect_right(&(1, "")), 3);
    }

    #[test]
    fn test_find_miss() {
        let mut s = Sorted::new(by_first);
        assert!(s.find(&4).is_none());
        s.insert_left((2, "x"));
        s.insert_left((6, "y"));
        assert!(s.find(&4).is_none());
        assert!(s.find(&7).is_none());
        assert_eq!(s.find(&6).unwrap().1, "y");
    }
}
