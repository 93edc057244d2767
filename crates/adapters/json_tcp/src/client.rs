//! Minimal client for the controller protocol.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use aquaria_domain::device::DeviceState;

use crate::error::ClientError;
use crate::request::Request;
use crate::response::{DeviceList, DeviceView, SensorList, SensorView};

const READ_CHUNK: usize = 1024;

/// One connection to a controller. Requests are answered in order.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl Client {
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when the connection cannot be made.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            buf: Vec::new(),
        })
    }

    /// Fetch one sensor by name, or all of them.
    ///
    /// # Errors
    ///
    /// See [`Client::call`].
    pub async fn sensors(&mut self, name: Option<&str>) -> Result<Vec<SensorView>, ClientError> {
        let request = Request::GetSensor {
            name: name.map(str::to_string),
        };
        let list: SensorList = self.call_as(&request).await?;
        Ok(list.sensor)
    }

    /// Fetch one device by name, or all of them.
    ///
    /// # Errors
    ///
    /// See [`Client::call`].
    pub async fn devices(&mut self, name: Option<&str>) -> Result<Vec<DeviceView>, ClientError> {
        let request = Request::GetDevice {
            name: name.map(str::to_string),
        };
        let list: DeviceList = self.call_as(&request).await?;
        Ok(list.device)
    }

    /// Override a device for `expire`, returning its new view.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] when the server knows no such
    /// device; the server has closed the connection by then.
    pub async fn set_device(
        &mut self,
        name: &str,
        state: DeviceState,
        expire: Duration,
    ) -> Result<Vec<DeviceView>, ClientError> {
        let request = Request::SetDevice {
            name: name.to_string(),
            state,
            expire,
        };
        let list: DeviceList = self.call_as(&request).await?;
        Ok(list.device)
    }

    /// Send `request` and read the response document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] for an empty `{}` answer,
    /// [`ClientError::Closed`] when the server hangs up first, and the
    /// underlying IO or JSON error otherwise.
    pub async fn call(&mut self, request: &Request) -> Result<Value, ClientError> {
        self.send_raw(request.to_json().to_string().as_bytes()).await?;
        let response = self.next_value().await?;
        if response.as_object().is_some_and(serde_json::Map::is_empty) {
            return Err(ClientError::Rejected);
        }
        Ok(response)
    }

    /// Write raw bytes, for requests the typed API cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] when the write fails.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    /// Read the next JSON document sent by the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] on end of stream.
    pub async fn next_value(&mut self) -> Result<Value, ClientError> {
        loop {
            let mut values = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
            match values.next() {
                Some(Ok(value)) => {
                    let used = values.byte_offset();
                    self.buf.drain(..used);
                    return Ok(value);
                }
                Some(Err(err)) if !err.is_eof() => return Err(err.into()),
                _ => {}
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(ClientError::Closed);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    async fn call_as<T: DeserializeOwned>(&mut self, request: &Request) -> Result<T, ClientError> {
        let value = self.call(request).await?;
        Ok(serde_json::from_value(value)?)
    }
}
