//! One step's worth of lane output.

use super::item::Item;

/// One lane slot: an item and whether the producer marked it valid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lane<T> {
    /// The item in this slot. Meaningless when `valid` is false.
    pub item: T,
    /// Whether the producer emitted an item on this lane.
    pub valid: bool,
}

impl<T> Lane<T> {
    /// A valid lane carrying `item`.
    pub fn valid(item: T) -> Self {
        Self { item, valid: true }
    }
}

impl<T: Default> Lane<T> {
    /// An empty lane.
    pub fn empty() -> Self {
        Self {
            item: T::default(),
            valid: false,
        }
    }
}

/// The `N` lane slots produced in a single pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneBatch<T> {
    lanes: Vec<Lane<T>>,
}

impl<T: Item> LaneBatch<T> {
    /// Wrap a vector of lanes.
    pub fn from_lanes(lanes: Vec<Lane<T>>) -> Self {
        Self { lanes }
    }

    /// Build a batch from `(item, valid)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (T, bool)>) -> Self {
        Self {
            lanes: pairs
                .into_iter()
                .map(|(item, valid)| Lane { item, valid })
                .collect(),
        }
    }

    /// A batch of `width` lanes whose first `items.len()` lanes are valid.
    ///
    /// Extra items beyond `width` are ignored.
    pub fn from_valid_prefix(width: usize, items: &[T]) -> Self {
        let lanes = (0..width)
            .map(|i| match items.get(i) {
                Some(item) => Lane::valid(*item),
                None => Lane::empty(),
            })
            .collect();
        Self { lanes }
    }

    /// A batch of `width` lanes with nothing valid.
    pub fn idle(width: usize) -> Self {
        Self {
            lanes: vec![Lane::empty(); width],
        }
    }

    /// Number of lanes.
    pub fn width(&self) -> usize {
        self.lanes.len()
    }

    /// Number of valid lanes.
    pub fn active_count(&self) -> usize {
        self.lanes.iter().filter(|lane| lane.valid).count()
    }

    /// The lanes in order.
    pub fn lanes(&self) -> &[Lane<T>] {
        &self.lanes
    }

    /// The valid items in lane order.
    pub fn valid_items(&self) -> impl Iterator<Item = T> + '_ {
        self.lanes
            .iter()
            .filter(|lane| lane.valid)
            .map(|lane| lane.item)
    }
}
