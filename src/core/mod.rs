pub mod collector;
pub mod etl;
pub mod projection;

pub use crate::domain::model::{Collection, Projection, RawResponse, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
