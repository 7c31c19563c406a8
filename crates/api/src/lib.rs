//! Campaign backend access: the `ApiGateway` boundary, its `reqwest`
//! implementation, and an in-process demo backend.

pub mod gateway;
pub mod http;
pub mod models;
pub mod stub;

pub use gateway::ApiGateway;
pub use http::HttpGateway;
pub use models::{
    ForecastKpis, ForecastPayload, ForecastSeries, PreviewPage, PublishReceipt, PublishRequest,
    StepAck, StepKind, StepPayload, UploadReceipt,
};
pub use stub::StubServer;
