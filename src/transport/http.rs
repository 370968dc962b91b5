use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::protocol::{
    FindSuccessorRequest, FindSuccessorResponse, JoinRequest, JoinResponse, NotifyRequest,
    PredecessorResponse, TransferRequest, TransferResponse, ENDPOINT_FORWARD, ENDPOINT_JOIN,
    ENDPOINT_KEEPALIVE, ENDPOINT_LOCAL_FILES, ENDPOINT_NOTIFY, ENDPOINT_PREDECESSOR,
    ENDPOINT_SUCCESSOR, ENDPOINT_TRANSFER,
};
use super::{Transport, TransportError, TransportResult};
use crate::chord::node::NodeInfo;

/// HTTP+JSON binding of the inter-node protocol.
///
/// One shared connection pool; every call carries the configured deadline.
/// No retries happen here: stabilization converges over cycles and client
/// routing bounds its own hops, so a failed call is simply reported.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn url(&self, target: &str, path: &str) -> String {
        format!("http://{}{}", target, path)
    }

    fn request_err(target: &str, source: reqwest::Error) -> TransportError {
        TransportError::Request {
            target: target.to_string(),
            source,
        }
    }

    fn check_status(target: &str, response: &reqwest::Response) -> TransportResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                target: target.to_string(),
                status: response.status().as_u16(),
            })
        }
    }

    async fn post_json<B, R>(&self, target: &str, path: &str, body: &B) -> TransportResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(target, path))
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        Self::check_status(target, &response)?;
        response
            .json::<R>()
            .await
            .map_err(|e| Self::request_err(target, e))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn find_successor(
        &self,
        target: &str,
        key: u64,
        requester: &str,
    ) -> TransportResult<NodeInfo> {
        let request = FindSuccessorRequest {
            id: key,
            requester: requester.to_string(),
        };
        let reply: FindSuccessorResponse =
            self.post_json(target, ENDPOINT_SUCCESSOR, &request).await?;
        Ok(NodeInfo {
            id: reply.successor_id,
            address: reply.successor_addr,
        })
    }

    async fn get_predecessor(&self, target: &str) -> TransportResult<Option<NodeInfo>> {
        let response = self
            .client
            .get(self.url(target, ENDPOINT_PREDECESSOR))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        Self::check_status(target, &response)?;
        let reply: PredecessorResponse = response
            .json()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        match (reply.predecessor_id, reply.predecessor_addr) {
            (Some(id), Some(address)) => Ok(Some(NodeInfo { id, address })),
            _ => Ok(None),
        }
    }

    async fn notify(&self, target: &str, candidate: &NodeInfo) -> TransportResult<()> {
        let request = NotifyRequest {
            predecessor_id: candidate.id,
            predecessor_addr: candidate.address.clone(),
        };
        let response = self
            .client
            .post(self.url(target, ENDPOINT_NOTIFY))
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        Self::check_status(target, &response)
    }

    async fn join(&self, target: &str, joiner: &NodeInfo) -> TransportResult<NodeInfo> {
        let request = JoinRequest {
            id: joiner.id,
            address: joiner.address.clone(),
        };
        let reply: JoinResponse = self.post_json(target, ENDPOINT_JOIN, &request).await?;
        Ok(NodeInfo {
            id: reply.successor_id,
            address: reply.successor_addr,
        })
    }

    async fn ping(&self, target: &str) -> TransportResult<()> {
        let response = self
            .client
            .post(self.url(target, ENDPOINT_KEEPALIVE))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        Self::check_status(target, &response)
    }

    async fn transfer_range(
        &self,
        target: &str,
        lo: u64,
        hi: u64,
    ) -> TransportResult<Vec<(String, Vec<u8>)>> {
        let request = TransferRequest { lo, hi };
        let reply: TransferResponse = self.post_json(target, ENDPOINT_TRANSFER, &request).await?;

        let mut files = Vec::with_capacity(reply.files.len());
        for entry in reply.files {
            let content =
                STANDARD
                    .decode(&entry.content)
                    .map_err(|e| TransportError::Malformed {
                        target: target.to_string(),
                        detail: format!("bad base64 for {}: {}", entry.filename, e),
                    })?;
            files.push((entry.filename, content));
        }
        Ok(files)
    }

    async fn forward_file(
        &self,
        target: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> TransportResult<()> {
        let part = reqwest::multipart::Part::bytes(content).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url(target, ENDPOINT_FORWARD))
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        Self::check_status(target, &response)
    }

    async fn get_file(&self, target: &str, filename: &str) -> TransportResult<Option<Vec<u8>>> {
        let url = format!("{}/{}", self.url(target, ENDPOINT_LOCAL_FILES), filename);
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check_status(target, &response)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn delete_file(&self, target: &str, filename: &str) -> TransportResult<bool> {
        let url = format!("{}/{}", self.url(target, ENDPOINT_LOCAL_FILES), filename);
        let response = self
            .client
            .delete(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::request_err(target, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check_status(target, &response)?;
        Ok(true)
    }
}
