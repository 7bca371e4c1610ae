mod convert;
mod error;
mod midi_importer;
mod model;
pub mod schema;
mod timing;
mod util;
mod validate;

pub use convert::*;
pub use error::*;
pub use midi_importer::*;
pub use model::config::*;
pub use model::flat::*;
pub use model::instrument::*;
pub use model::nested::*;
pub use timing::*;
pub use util::*;
pub use validate::*;
