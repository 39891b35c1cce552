use crate::{collection::CollectionError, fits::FitsError, session::FocusError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `fits` module")]
    Fits(#[from] FitsError),
    #[error("Error in the `collection` module")]
    Collection(#[from] CollectionError),
    #[error("Error in the `session` module")]
    Focus(#[from] FocusError),
}
