use bytes::BytesMut;
use prost::Message;
use tokio::io::{AsyncRead as Read, AsyncReadExt, AsyncWrite as Write, AsyncWriteExt, BufWriter};

use crate::{
    codec::{decode, encode},
    stream_split::StreamSplit,
    Error, Result,
};

const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Reads length-delimited messages from a byte stream
pub struct StreamReader<S>
where
    S: Read + Unpin,
{
    stream: S,
    read_buf: [u8; DEFAULT_BUFFER_SIZE],
    buf: BytesMut,
}

impl<S> StreamReader<S>
where
    S: Read + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: [0; DEFAULT_BUFFER_SIZE],
            buf: BytesMut::new(),
        }
    }

    /// Reads the next message, returning `Ok(None)` on a clean end of stream
    ///
    /// A stream that ends in the middle of a frame yields [`Error::UnexpectedEof`].
    pub async fn read<M: Message + Default>(&mut self) -> Result<Option<M>> {
        loop {
            if let Some(message) = decode::<M>(&mut self.buf)? {
                return Ok(Some(message));
            }

            if self.fill_buf().await? == 0 {
                return if self.buf.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::UnexpectedEof)
                };
            }
        }
    }

    async fn fill_buf(&mut self) -> Result<usize> {
        let bytes_read = self.stream.read(&mut self.read_buf).await?;

        if bytes_read == 0 {
            return Ok(0);
        }

        self.buf.extend_from_slice(&self.read_buf[0..bytes_read]);
        Ok(bytes_read)
    }
}

/// Writes length-delimited messages into a buffered byte stream
///
/// Written frames stay in the buffer until [`StreamWriter::flush`] is called (or the buffer fills up).
pub struct StreamWriter<S>
where
    S: Write + Unpin,
{
    stream: BufWriter<S>,
    buf: BytesMut,
}

impl<S> StreamWriter<S>
where
    S: Write + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buf: BytesMut::new(),
        }
    }

    pub async fn write<M: Message>(&mut self, message: &M) -> Result<()> {
        self.buf.clear();
        encode(message, &mut self.buf)?;

        self.stream.write_all(&self.buf).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.stream.flush().await?;
        Ok(())
    }

    /// Flushes buffered frames and shuts down the write side of the stream
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

pub fn get_stream_pair<S: StreamSplit>(
    stream: S,
) -> (StreamReader<S::Reader>, StreamWriter<S::Writer>) {
    let (reader, writer) = stream.split_stream();
    (StreamReader::new(reader), StreamWriter::new(writer))
}

#[cfg(test)]
mod tests {
    use mock_io::tokio::{MockListener, MockStream};

    use super::*;
    use crate::proto::abci::{Request, RequestInfo};

    #[tokio::test]
    async fn check_messages_cross_the_stream() {
        let (mut listener, handle) = MockListener::new();
        let client = MockStream::connect(&handle).unwrap();
        let server = listener.accept().await.unwrap();

        let (_, mut writer) = get_stream_pair(client);
        let (mut reader, _) = get_stream_pair(server);

        writer.write(&Request::echo("hello")).await.unwrap();
        writer
            .write(&Request::info(RequestInfo {
                version: "0.38.0".to_string(),
                ..Default::default()
            }))
            .await
            .unwrap();
        writer.write(&Request::flush()).await.unwrap();
        writer.flush().await.unwrap();

        let echo: Request = reader.read().await.unwrap().unwrap();
        assert_eq!(echo, Request::echo("hello"));

        let info: Request = reader.read().await.unwrap().unwrap();
        assert!(matches!(
            info.value,
            Some(crate::proto::abci::request::Value::Info(RequestInfo { version, .. })) if version == "0.38.0"
        ));

        let flush: Request = reader.read().await.unwrap().unwrap();
        assert!(flush.is_flush());
    }
}
