//! Request extractors that reject with the API's JSON error body.
//!
//! - [`UploadForm`] parses and spools the upload form.
//! - [`TokenPath`] reads the token of the progress route.

mod token_path;
mod upload_form;

pub use token_path::TokenPath;
pub use upload_form::{FILE_FIELD, SpooledFile, TOKEN_FIELD, UploadForm};
