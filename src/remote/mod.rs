// Remote transport: the transactional Cypher endpoint over HTTP.
//
// - client: the `HttpClient` boundary the application implements
// - protocol: request/response JSON and status mapping
// - transaction: server-side transactions and the begin request
// - driver: `RemoteDriver`

pub mod client;
pub mod driver;
mod protocol;
mod transaction;

pub use client::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use driver::RemoteDriver;
