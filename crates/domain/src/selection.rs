use std::collections::BTreeSet;

use estatedesk_core::RecordId;

/// Selected row ids of the loaded page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionSet(BTreeSet<RecordId>);

impl SelectionSet {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or removes one id.
    pub fn toggle(&mut self, id: RecordId) {
        if !self.0.remove(&id) {
            self.0.insert(id);
        }
    }

    /// Selects every visible id, or clears when they are already exactly selected.
    ///
    /// This never unions with a previous partial selection and never reaches
    /// rows outside the loaded page.
    pub fn select_all_visible<'a>(&mut self, visible: impl IntoIterator<Item = &'a RecordId>) {
        let visible: BTreeSet<RecordId> = visible.into_iter().cloned().collect();
        if !visible.is_empty() && self.0 == visible {
            self.0.clear();
        } else {
            self.0 = visible;
        }
    }

    /// Drops ids that are no longer visible.
    pub fn retain_visible<'a>(&mut self, visible: impl IntoIterator<Item = &'a RecordId>) {
        let visible: BTreeSet<&RecordId> = visible.into_iter().collect();
        self.0.retain(|id| visible.contains(id));
    }

    /// Clears the selection.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Returns whether the id is selected.
    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.0.contains(id)
    }

    /// Returns the selected ids in order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.0.iter().cloned().collect()
    }

    /// Returns the number of selected ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
