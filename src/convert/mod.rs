//! [crate::convert] moves a model between the file-shaped parse tree and the canonical model.
//!
//! Both directions validate their output before returning it: [`to_canonical`] with
//! [`crate::canonical::validate::check`], [`from_canonical`] with the completeness and
//! cross-reference passes of [`crate::tree`].

mod from_canonical;
mod to_canonical;

pub use from_canonical::from_canonical;
pub use to_canonical::to_canonical;

use crate::{error::ModelError, key::Key};

const TRANSITION_PREFIX: &str = "transition_";

/// Local name of the transition at `ordinal` in its state machine's list.
pub fn transition_name(ordinal: usize) -> String {
    format!("{TRANSITION_PREFIX}{ordinal}")
}

/// The list position encoded in a transition key, if it has one.
pub fn transition_ordinal(key: &Key) -> Option<usize> {
    key.name().strip_prefix(TRANSITION_PREFIX)?.parse().ok()
}

pub(crate) fn conversion(message: impl Into<String>) -> ModelError {
    ModelError::Conversion(message.into())
}
