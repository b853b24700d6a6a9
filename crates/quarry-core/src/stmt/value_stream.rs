use super::*;

use std::{
    collections::VecDeque,
    fmt,
    pin::Pin,
    task::{Context, Poll},
};
use tokio_stream::{Stream, StreamExt};

/// Rows produced by a query, either already materialized or pulled lazily
/// from the backend. Each item is one row.
#[derive(Default)]
pub struct ValueStream {
    /// Rows available without polling, drained before `source`
    ready: VecDeque<Value>,

    source: Option<RowSource>,
}

type RowSource = Pin<Box<dyn Stream<Item = crate::Result<Value>> + Send + 'static>>;

struct Mapped<F> {
    inner: ValueStream,
    f: F,
}

impl ValueStream {
    pub fn from_stream<T: Stream<Item = crate::Result<Value>> + Send + 'static>(stream: T) -> Self {
        Self {
            ready: VecDeque::new(),
            source: Some(Box::pin(stream)),
        }
    }

    pub fn from_vec(rows: Vec<Value>) -> Self {
        Self {
            ready: rows.into(),
            source: None,
        }
    }

    /// Returns the next row, or `None` once the stream is exhausted.
    pub async fn next(&mut self) -> Option<crate::Result<Value>> {
        StreamExt::next(self).await
    }

    pub async fn collect(mut self) -> crate::Result<Vec<Value>> {
        let (low, _) = self.size_hint();
        let mut rows = Vec::with_capacity(low);

        while let Some(row) = self.next().await {
            rows.push(row?);
        }

        Ok(rows)
    }

    /// Collects the stream into records, failing on any non-record item.
    pub async fn collect_records(self) -> crate::Result<Vec<ValueRecord>> {
        self.collect()
            .await?
            .into_iter()
            .map(Value::into_record)
            .collect()
    }

    /// Wraps the stream so every row is passed through `f`. The first error
    /// `f` returns is yielded in place of its row.
    pub fn map<F>(self, f: F) -> ValueStream
    where
        F: FnMut(Value) -> crate::Result<Value> + Send + 'static,
    {
        ValueStream::from_stream(Mapped { inner: self, f })
    }
}

impl Stream for ValueStream {
    type Item = crate::Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(row) = self.ready.pop_front() {
            return Poll::Ready(Some(Ok(row)));
        }

        match self.source.as_mut() {
            Some(source) => source.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let ready = self.ready.len();

        match &self.source {
            Some(source) => {
                let (low, high) = source.size_hint();
                (low + ready, high.map(|high| high + ready))
            }
            None => (ready, Some(ready)),
        }
    }
}

impl From<Vec<Value>> for ValueStream {
    fn from(rows: Vec<Value>) -> Self {
        Self::from_vec(rows)
    }
}

impl<F> Unpin for Mapped<F> {}

impl<F> Stream for Mapped<F>
where
    F: FnMut(Value) -> crate::Result<Value>,
{
    type Item = crate::Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some((this.f)(row))),
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl fmt::Debug for ValueStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStream")
            .field("ready", &self.ready.len())
            .field("pending", &self.source.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_is_empty() {
        let mut stream = ValueStream::default();
        assert_eq!(stream.size_hint(), (0, Some(0)));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn mapped_stream_applies_in_order() {
        let stream = ValueStream::from_vec(vec![Value::I64(1), Value::I64(2)])
            .map(|value| Ok(Value::I64(value.as_i64().unwrap_or_default() * 10)));

        let values = stream.collect().await.unwrap();
        assert_eq!(values, vec![Value::I64(10), Value::I64(20)]);
    }

    #[tokio::test]
    async fn lazy_rows_follow_ready_rows() {
        let source = tokio_stream::iter(vec![Ok(Value::I64(2)), Ok(Value::I64(3))]);
        let mut stream = ValueStream::from_stream(source);
        stream.ready.push_back(Value::I64(1));

        let values = stream.collect().await.unwrap();
        assert_eq!(values, vec![Value::I64(1), Value::I64(2), Value::I64(3)]);
    }

    #[tokio::test]
    async fn collect_records_rejects_non_records() {
        let stream = ValueStream::from_vec(vec![Value::I64(1)]);
        assert!(stream.collect_records().await.is_err());
    }
}
