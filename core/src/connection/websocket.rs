use crate::connection::transport::{Connector, Frame, Transport, TransportError};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

type FeedStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket (`ws://` / `wss://`) connections to the feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

pub struct WebSocketTransport {
    stream: FeedStream,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(Message::Binary(bytes)) => {
                    let frame = match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => Frame::Text(text),
                        Err(err) => Frame::Undecodable(format!("binary frame: {err}")),
                    };
                    return Some(Ok(frame));
                }
                Ok(Message::Close(_)) => return None,
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Err(err) => return Some(Err(TransportError::Io(err.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        // The peer may already be gone; a failed close handshake is not actionable.
        let _ = self.stream.close(None).await;
    }
}
