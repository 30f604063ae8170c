//! Streaming gzip decoding of request bodies.
//!
//! Git clients gzip large upload-pack requests and mark them with
//! `Content-Encoding: gzip`. Compressed chunks are queued one at a time and
//! inflated into buffers of at most [`MAX_DECODED_CHUNK`] bytes; the next
//! upstream chunk is pulled only once the queued one is used up, so a small
//! highly compressed chunk never expands in memory all at once.

use bytes::{Buf, Bytes};
use flate2::bufread::MultiGzDecoder;
use futures::Stream;
use std::io::{self, BufRead, Read};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Largest decoded item yielded by [`GunzipStream`].
pub const MAX_DECODED_CHUNK: usize = 64 * 1024;

/// Compressed bytes received but not yet inflated.
///
/// Reports `WouldBlock` when drained before upstream has ended, which the
/// decoder passes back up without losing its place.
#[derive(Debug, Default)]
struct PendingInput {
    chunk: Bytes,
    eof: bool,
}

impl Read for PendingInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for PendingInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.chunk.is_empty() && !self.eof {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        Ok(&self.chunk)
    }

    fn consume(&mut self, amt: usize) {
        self.chunk.advance(amt);
    }
}

/// Decodes a stream of gzip-compressed chunks.
pub struct GunzipStream<S> {
    inner: S,
    decoder: Option<MultiGzDecoder<PendingInput>>,
}

impl<S> GunzipStream<S> {
    /// Wraps a compressed byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: Some(MultiGzDecoder::new(PendingInput::default())),
        }
    }
}

impl<S> Stream for GunzipStream<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let mut out = vec![0u8; MAX_DECODED_CHUNK];

        loop {
            let Some(decoder) = this.decoder.as_mut() else {
                return Poll::Ready(None);
            };

            match decoder.read(&mut out) {
                Ok(0) => {
                    this.decoder = None;
                    return Poll::Ready(None);
                }
                Ok(n) => {
                    out.truncate(n);
                    return Poll::Ready(Some(Ok(Bytes::from(out))));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    this.decoder = None;
                    return Poll::Ready(Some(Err(e)));
                }
            }

            // The queued input is used up: pull the next compressed chunk.
            let input = decoder.get_mut();
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(chunk)) => input.chunk = chunk,
                Some(Err(e)) => {
                    this.decoder = None;
                    return Poll::Ready(Some(Err(e)));
                }
                None => input.eof = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use futures::{stream, StreamExt};
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    async fn decode_items(compressed: Vec<u8>, chunk_size: usize) -> io::Result<Vec<Bytes>> {
        let chunks: Vec<io::Result<Bytes>> = compressed
            .chunks(chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let mut decoded = GunzipStream::new(stream::iter(chunks));

        let mut items = Vec::new();
        while let Some(item) = decoded.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    async fn decode_chunks(compressed: Vec<u8>, chunk_size: usize) -> io::Result<Vec<u8>> {
        Ok(decode_items(compressed, chunk_size).await?.concat())
    }

    #[tokio::test]
    async fn test_decodes_across_chunk_boundaries() {
        let payload: Vec<u8> = (0..50_000u32).flat_map(|i| i.to_le_bytes()).collect();
        let compressed = gzip(&payload);

        for chunk_size in [1, 7, 512, compressed.len()] {
            assert_eq!(decode_chunks(compressed.clone(), chunk_size).await.unwrap(), payload);
        }
    }

    #[tokio::test]
    async fn test_decoded_items_are_bounded() {
        let payload = vec![0u8; 8 * 1024 * 1024];
        let compressed = gzip(&payload);
        assert!(compressed.len() < MAX_DECODED_CHUNK);

        // The whole body arrives as one small chunk.
        let items = decode_items(compressed.clone(), compressed.len()).await.unwrap();
        assert!(items.len() >= payload.len() / MAX_DECODED_CHUNK);
        assert!(items.iter().all(|item| item.len() <= MAX_DECODED_CHUNK));
        assert_eq!(items.iter().map(Bytes::len).sum::<usize>(), payload.len());
    }

    #[tokio::test]
    async fn test_upstream_is_pulled_lazily() {
        let payload = vec![7u8; 1024 * 1024];
        let compressed = gzip(&payload);
        let pulled = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let counter = pulled.clone();
        let chunks: Vec<io::Result<Bytes>> = vec![Ok(Bytes::from(compressed)), Ok(Bytes::new())];
        let chunks = stream::iter(chunks).inspect(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let mut decoded = GunzipStream::new(chunks);

        let first = decoded.next().await.unwrap().unwrap();
        assert!(!first.is_empty() && first.len() <= MAX_DECODED_CHUNK);
        assert_eq!(pulled.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concatenated_members() {
        let mut compressed = gzip(b"0032want 1111111111111111111111111111111111111111\n");
        compressed.extend(gzip(b"00000009done\n"));

        let decoded = decode_chunks(compressed, 16).await.unwrap();
        assert_eq!(
            decoded,
            b"0032want 1111111111111111111111111111111111111111\n00000009done\n"
        );
    }

    #[tokio::test]
    async fn test_rejects_plain_bytes() {
        assert!(decode_chunks(b"0000 definitely not gzip".to_vec(), 8)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_rejects_truncated_body() {
        let compressed = gzip(&[1u8; 4096]);
        let truncated = compressed[..compressed.len() - 6].to_vec();
        assert!(decode_chunks(truncated, 64).await.is_err());
    }

    #[tokio::test]
    async fn test_propagates_upstream_errors() {
        let chunks: Vec<io::Result<Bytes>> = vec![Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "client went away",
        ))];
        let mut decoded = GunzipStream::new(stream::iter(chunks));
        let err = decoded.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(decoded.next().await.is_none());
    }
}
