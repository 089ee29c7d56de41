use thiserror::Error;

use crate::neighbor::VectorHandle;

#[derive(Debug, Error)]
pub enum PredictError {
  #[error("vector has {keys} keys but {values} values")]
  MismatchedLengths { keys: usize, values: usize },
  #[error("vector keys must be strictly ascending")]
  UnsortedKeys,
  #[error("rating of user {user} for item {item} is not finite")]
  NonFiniteRating { user: i64, item: i64 },
  #[error("no neighbor vector registered for {0:?}")]
  UnknownVector(VectorHandle),
  #[error(transparent)]
  Collaborator(#[from] anyhow::Error)
}
