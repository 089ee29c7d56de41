use serde::Serialize;

use super::vector::SparseVector;

/// A scored item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation<T> {
  pub item_id: T,
  pub score: f64
}

impl<T> Recommendation<T> {
  pub fn new(item_id: T, score: f64) -> Self {
    Self { item_id, score }
  }
}

impl<IntoId, Id> From<(IntoId, f64)> for Recommendation<Id>
  where IntoId: Into<Id> {
  fn from(value: (IntoId, f64)) -> Self {
    Recommendation::new(value.0.into(), value.1)
  }
}

/// Recommendations ordered from highest to lowest score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationList<K>(pub Vec<Recommendation<K>>);

impl<K> RecommendationList<K> {

  pub fn new_with_sort(mut recs: Vec<Recommendation<K>>) -> Self {
    recs.sort_by(|this, other| other.score.total_cmp(&this.score));
    Self(recs)
  }

  pub fn from_iter_with_sort<I>(value: I) -> Self
    where I: IntoIterator,
          I::Item: Into<Recommendation<K>> {
    let recs = value.into_iter()
      .map(|item| item.into())
      .collect::<Vec<Recommendation<K>>>();
    Self::new_with_sort(recs)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Keep only the `n` best recommendations.
  pub fn truncate(mut self, n: usize) -> Self {
    self.0.truncate(n);
    self
  }
}

impl RecommendationList<i64> {
  /// Rank `predictions`, dropping items without a prediction and items the user
  /// already rated.
  pub fn from_predictions(predictions: &SparseVector, rated: &SparseVector) -> Self {
    Self::from_iter_with_sort(
      predictions.iter()
        .filter(|(_, score)| !score.is_nan())
        .filter(|(item, _)| !rated.contains_key(*item))
    )
  }
}

impl<K> From<RecommendationList<K>> for Vec<Recommendation<K>> {
  fn from(value: RecommendationList<K>) -> Self {
    value.0
  }
}
