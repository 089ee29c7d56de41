use std::{cell::RefCell, collections::HashMap};

use proptest::prelude::*;
use user_knn::{
  IdentityNormalizer,
  ItemScope,
  MeanCenteringNormalizer,
  MutableSparseVector,
  Neighbor,
  NeighborhoodFinder,
  Neighborhoods,
  Normalizer,
  PredictError,
  RatingPredictor,
  SparseVector,
  UserUserPredictor,
  norm::IdentityTransformation
};

/// One neighbor: their user id, similarity, ratings and the items they vote on.
struct Entry {
  user: i64,
  similarity: f64,
  ratings: Vec<(i64, f64)>,
  votes_on: Vec<i64>
}

/// Builds one vector per entry and lists it under every item it votes on.
struct ListFinder(Vec<Entry>);

impl NeighborhoodFinder for ListFinder {
  fn find_neighbors(&self, _user: i64, _ratings: &SparseVector, _scope: Option<&ItemScope>)
      -> Result<Neighborhoods, PredictError> {
    let mut builder = Neighborhoods::builder();
    for entry in &self.0 {
      let handle = builder.add_vector(SparseVector::from_pairs(entry.ratings.clone()));
      for item in &entry.votes_on {
        builder.add_neighbor(*item, Neighbor::new(entry.user, entry.similarity, handle))?;
      }
    }
    Ok(builder.build())
  }
}

/// Counts normalize calls per vector address.
#[derive(Default)]
struct CountingNormalizer {
  calls: RefCell<HashMap<usize, usize>>
}

impl CountingNormalizer {
  fn counts(&self) -> Vec<usize> {
    self.calls.borrow().values().copied().collect()
  }
}

impl Normalizer for CountingNormalizer {
  type Transformation = IdentityTransformation;

  fn normalize(&self, _user: i64, ratings: &mut MutableSparseVector) -> Result<(), PredictError> {
    let address = ratings as *const MutableSparseVector as usize;
    *self.calls.borrow_mut().entry(address).or_insert(0) += 1;
    Ok(())
  }

  fn make_transformation(&self, user: i64, ratings: &SparseVector)
      -> Result<IdentityTransformation, PredictError> {
    IdentityNormalizer.make_transformation(user, ratings)
  }
}

struct FailingFinder;

impl NeighborhoodFinder for FailingFinder {
  fn find_neighbors(&self, _user: i64, _ratings: &SparseVector, _scope: Option<&ItemScope>)
      -> Result<Neighborhoods, PredictError> {
    Err(anyhow::anyhow!("similarity backend unavailable").into())
  }
}

fn entry(user: i64, similarity: f64, rating: f64, item: i64) -> Entry {
  Entry { user, similarity, ratings: vec![(item, rating)], votes_on: vec![item] }
}

fn predict_raw(entries: Vec<Entry>, items: &[i64]) -> SparseVector {
  UserUserPredictor::new(ListFinder(entries), IdentityNormalizer)
    .predict(0, &SparseVector::empty(), Some(items))
    .unwrap()
}

#[test]
fn positive_similarities_average_ratings() {
  let predictions = predict_raw(vec![entry(1, 0.8, 5.0, 7), entry(2, 0.2, 3.0, 7)], &[7]);
  assert!((predictions.get(7) - 4.6).abs() < 1e-12);
}

#[test]
fn negative_similarity_offsets_without_losing_weight() {
  let predictions = predict_raw(vec![entry(1, -0.5, 1.0, 7), entry(2, 0.5, 5.0, 7)], &[7]);
  assert!((predictions.get(7) - 2.0).abs() < 1e-12);
}

#[test]
fn item_without_neighbors_is_absent() {
  let predictions = predict_raw(vec![entry(1, 0.8, 5.0, 7)], &[7, 8]);
  assert_eq!(predictions.keys(), &[7, 8]);
  assert_eq!(predictions.get(7), 5.0);
  assert!(predictions.get(8).is_nan());
}

#[test]
fn duplicate_requested_items_collapse() {
  let predictions = predict_raw(vec![entry(1, 1.0, 4.0, 7)], &[7, 7, 3]);
  assert_eq!(predictions.keys(), &[3, 7]);
}

#[test]
fn shared_vector_normalized_once() {
  let finder = ListFinder(vec![Entry {
    user: 1,
    similarity: 0.7,
    ratings: vec![(7, 4.0), (8, 3.0), (9, 2.0)],
    votes_on: vec![7, 8, 9]
  }]);
  let normalizer = CountingNormalizer::default();
  let predictor = UserUserPredictor::new(finder, &normalizer);
  predictor.predict(0, &SparseVector::empty(), Some(&[7, 8, 9][..])).unwrap();
  assert_eq!(normalizer.counts(), vec![1]);
}

#[test]
fn equal_vectors_of_different_neighbors_both_normalized() {
  let finder = ListFinder(vec![entry(1, 0.5, 4.0, 7), entry(2, 0.5, 4.0, 7)]);
  let normalizer = CountingNormalizer::default();
  let predictor = UserUserPredictor::new(finder, &normalizer);
  predictor.predict(0, &SparseVector::empty(), Some(&[7][..])).unwrap();
  assert_eq!(normalizer.counts(), vec![1, 1]);
}

#[test]
fn mean_centering_round_trips_known_rating() {
  let user_ratings = vec![(7, 4.0), (8, 2.0), (9, 5.0)];
  let finder = ListFinder(vec![Entry {
    user: 1,
    similarity: 1.0,
    ratings: user_ratings.clone(),
    votes_on: vec![7, 8, 9]
  }]);
  let predictor = UserUserPredictor::new(finder, MeanCenteringNormalizer::default());
  let ratings = SparseVector::from_pairs(user_ratings);
  let predictions = predictor.predict(0, &ratings, None).unwrap();
  for (item, rating) in ratings.iter() {
    assert!((predictions.get(item) - rating).abs() < 1e-9);
  }
}

#[test]
fn collaborator_errors_propagate() {
  let predictor = UserUserPredictor::new(FailingFinder, IdentityNormalizer);
  let result = predictor.predict(0, &SparseVector::empty(), Some(&[1][..]));
  match result {
    Err(PredictError::Collaborator(err)) =>
      assert_eq!(err.to_string(), "similarity backend unavailable"),
    other => panic!("unexpected result {:?}", other)
  }
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  /// With only positive similarities the prediction stays within the range of
  /// the neighbors' ratings.
  #[test]
  fn prop_positive_weights_stay_in_range(
    votes in prop::collection::vec((0.01f64..1.0, 1.0f64..5.0), 1..8)
  ) {
    let entries = votes.iter()
      .enumerate()
      .map(|(idx, (sim, rating))| entry(idx as i64 + 1, *sim, *rating, 7))
      .collect();
    let predicted = predict_raw(entries, &[7]).get(7);
    let min = votes.iter().map(|(_, r)| *r).fold(f64::INFINITY, f64::min);
    let max = votes.iter().map(|(_, r)| *r).fold(f64::NEG_INFINITY, f64::max);
    prop_assert!(predicted >= min - 1e-9 && predicted <= max + 1e-9);
  }

  /// Neighbor order never changes the result.
  #[test]
  fn prop_order_independent(
    votes in prop::collection::vec((-1.0f64..1.0, 1.0f64..5.0), 1..8)
  ) {
    let build = |votes: &[(f64, f64)]| -> Vec<Entry> {
      votes.iter()
        .enumerate()
        .map(|(idx, (sim, rating))| entry(idx as i64 + 1, *sim, *rating, 7))
        .collect()
    };
    let mut reversed = votes.clone();
    reversed.reverse();
    let forward = predict_raw(build(&votes), &[7]).get(7);
    let backward = predict_raw(build(&reversed), &[7]).get(7);
    prop_assert!(
      (forward.is_nan() && backward.is_nan()) || (forward - backward).abs() < 1e-9
    );
  }
}
