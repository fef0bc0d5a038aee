//! Ingestion transports behind the `MessageSource` seam.

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;

use crate::application::ingest::{MessageSource, SourceError};

/// Postgres `LISTEN/NOTIFY` transport: every notification payload on the
/// configured channel is one order message.
pub struct PgChannelSource {
    listener: PgListener,
}

impl PgChannelSource {
    pub async fn connect(pool: &PgPool, channel: &str) -> Result<Self, SourceError> {
        let mut listener = PgListener::connect_with(pool)
            .await
            .map_err(|err| SourceError::connection(err.to_string()))?;
        listener
            .listen(channel)
            .await
            .map_err(|err| SourceError::connection(err.to_string()))?;
        Ok(Self { listener })
    }
}

#[async_trait]
impl MessageSource for PgChannelSource {
    async fn recv(&mut self) -> Result<Option<Bytes>, SourceError> {
        let notification = self
            .listener
            .recv()
            .await
            .map_err(|err| SourceError::connection(err.to_string()))?;
        Ok(Some(Bytes::copy_from_slice(
            notification.payload().as_bytes(),
        )))
    }
}

/// In-process transport over a tokio channel, for embedders and tests.
pub struct ChannelSource {
    rx: mpsc::Receiver<Bytes>,
}

impl ChannelSource {
    /// Returns the sender half alongside the source; `recv` yields `None`
    /// once every sender has been dropped.
    pub fn new(capacity: usize) -> (mpsc::Sender<Bytes>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self) -> Result<Option<Bytes>, SourceError> {
        Ok(self.rx.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_source_delivers_payloads_in_order() {
        let (tx, mut source) = ChannelSource::new(2);

        tx.send(Bytes::from_static(b"one")).await.expect("send one");
        tx.send(Bytes::from_static(b"two")).await.expect("send two");

        assert_eq!(
            source.recv().await.expect("recv one"),
            Some(Bytes::from_static(b"one"))
        );
        assert_eq!(
            source.recv().await.expect("recv two"),
            Some(Bytes::from_static(b"two"))
        );
    }

    #[tokio::test]
    async fn channel_source_closes_when_senders_drop() {
        let (tx, mut source) = ChannelSource::new(1);
        drop(tx);

        assert_eq!(source.recv().await.expect("closed stream"), None);
    }
}
