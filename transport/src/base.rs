//! The round-tripper seam the Auth Transport composes with. A
//! caller-supplied base (e.g. a JSON-patch/body-mutation layer) sits
//! *beneath* the Auth Transport; the default base is a plain `reqwest`
//! client.

use async_trait::async_trait;

#[async_trait]
pub trait BaseTransport: Send + Sync {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error>;
}

#[async_trait]
impl BaseTransport for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, reqwest::Error> {
        reqwest::Client::execute(self, request).await
    }
}
