pub mod request;
pub mod response;

pub use request::{HyperlocalQuery, TilesQuery};
pub use response::{HealthResponse, SubmitResponse};
