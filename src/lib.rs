//! User-user collaborative filtering rating prediction.
//!
//! A [`UserUserPredictor`] asks a [`NeighborhoodFinder`] for the users that can
//! vote on each requested item, normalizes their ratings with a [`Normalizer`],
//! takes the similarity-weighted mean per item and maps the result back onto
//! the target user's rating scale.

pub mod error;
#[cfg(feature = "static_finder")]
pub mod finder;
pub mod list;
pub mod neighbor;
pub mod norm;
pub mod predictor;
pub mod scope;
pub mod vector;

#[macro_use]
extern crate derive_builder;

#[cfg(feature = "static_finder")]
pub use finder::{RatingStore, StaticNeighborhoodFinder};
pub use error::PredictError;
pub use list::{Recommendation, RecommendationList};
pub use neighbor::{Neighbor, NeighborhoodFinder, Neighborhoods, VectorHandle};
pub use norm::{
  IdentityNormalizer,
  MeanCenteringNormalizer,
  MeanVarianceNormalizer,
  Normalizer,
  VectorTransformation
};
pub use predictor::{UserUserPredictor, UserUserPredictorBuilder, normalize_neighbor_ratings};
pub use scope::ItemScope;
pub use vector::{ABSENT, MutableSparseVector, SparseVector};

pub trait RatingPredictor {
  /// Predict `user`'s ratings for `items`, or for every item that can be
  /// predicted when `items` is `None`. Items nobody can vote on come back as
  /// [`ABSENT`].
  fn predict(&self, user: i64, ratings: &SparseVector, items: Option<&[i64]>)
      -> Result<SparseVector, PredictError>;
}
