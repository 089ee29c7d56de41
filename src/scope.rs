/// Canonical set of item ids a prediction is requested for: ascending and free
/// of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemScope(Vec<i64>);

impl ItemScope {
  pub fn new<I>(items: I) -> Self
    where I: IntoIterator<Item = i64> {
    let mut items: Vec<i64> = items.into_iter().collect();
    items.sort_unstable();
    items.dedup();
    Self(items)
  }

  pub fn contains(&self, item: i64) -> bool {
    self.0.binary_search(&item).is_ok()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn as_slice(&self) -> &[i64] {
    &self.0
  }

  pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
    self.0.iter().copied()
  }
}

impl FromIterator<i64> for ItemScope {
  fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
    Self::new(iter)
  }
}

impl From<&[i64]> for ItemScope {
  fn from(value: &[i64]) -> Self {
    Self::new(value.iter().copied())
  }
}
