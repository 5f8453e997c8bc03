use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use anvil_config::NetworkConfig;
use serde::de::DeserializeOwned;

use crate::error::{PipelineError, Result};

/// Blocking HTTP client with connect and read timeouts.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(network: &NetworkConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(network.connect_timeout_ms))
            .timeout_read(Duration::from_millis(network.read_timeout_ms))
            .build();
        Self { agent }
    }

    fn call(&self, url: &str) -> Result<ureq::Response> {
        tracing::debug!(target: "anvil.pipeline", url, "GET");
        self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::Status(status, _response) => PipelineError::Transport {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => PipelineError::Http {
                url: url.to_string(),
                message: transport.to_string(),
            },
        })
    }

    fn read_error(url: &str) -> impl FnOnce(io::Error) -> PipelineError + '_ {
        move |err| PipelineError::Http {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.call(url)?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(Self::read_error(url))?;
        Ok(body)
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_bytes(url)?;
        serde_json::from_slice(&body).map_err(|err| PipelineError::InvalidResponse {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    /// Streams the response body into `dest`. Returns the number of bytes.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self.call(url)?;
        let file = File::create(dest).map_err(PipelineError::io(dest))?;
        let mut out = BufWriter::new(file);
        let bytes = io::copy(&mut response.into_reader(), &mut out)
            .map_err(Self::read_error(url))?;
        out.flush().map_err(PipelineError::io(dest))?;

        tracing::info!(target: "anvil.pipeline", url, path = %dest.display(), bytes, "downloaded");
        Ok(bytes)
    }
}
