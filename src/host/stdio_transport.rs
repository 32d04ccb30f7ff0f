// Newline-delimited JSON over any async byte stream; stdin/stdout in production.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::event_loop::{EventSource, ReplySink, TransportError};
use super::protocol::{encode_reply, parse_event, InboundEvent, OutboundReply};

pub struct LineSource<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }
}

pub fn stdin_source() -> LineSource<tokio::io::Stdin> {
    LineSource::new(tokio::io::stdin())
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> EventSource for LineSource<R> {
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TransportError>> {
        loop {
            // Raw bytes, so a line that is not UTF-8 costs one event, not the stream.
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(TransportError::Io(e))),
            }
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    return Some(Err(TransportError::Malformed(format!(
                        "line is not valid UTF-8: {}",
                        e
                    ))))
                }
            };
            if line.is_empty() {
                continue;
            }
            return Some(
                parse_event(line).map_err(|e| TransportError::Malformed(e.to_string())),
            );
        }
    }
}

pub struct LineSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

pub fn stdout_sink() -> LineSink<tokio::io::Stdout> {
    LineSink::new(tokio::io::stdout())
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ReplySink for LineSink<W> {
    async fn send(&mut self, reply: &OutboundReply) -> Result<(), TransportError> {
        let mut line = encode_reply(reply).map_err(|e| TransportError::Malformed(e.to_string()))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_events_skipping_blank_lines() {
        let input = b"{\"type\":\"confirmation\",\"pending_id\":\"pc-1\",\"approved\":false}\n\n{oops\n{\"type\":\"shutdown\"}\n";
        let mut source = LineSource::new(&input[..]);

        assert!(matches!(
            source.next_event().await,
            Some(Ok(InboundEvent::Confirmation { approved: false, .. }))
        ));
        assert!(matches!(
            source.next_event().await,
            Some(Err(TransportError::Malformed(_)))
        ));
        assert!(matches!(
            source.next_event().await,
            Some(Ok(InboundEvent::Shutdown))
        ));
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_malformed_and_reading_continues() {
        let input = b"{\"type\":\"shutd\xffown\"}\r\n{\"type\":\"shutdown\"}\r\n";
        let mut source = LineSource::new(&input[..]);

        match source.next_event().await {
            Some(Err(TransportError::Malformed(message))) => assert!(message.contains("UTF-8")),
            other => panic!("expected malformed line, got {other:?}"),
        }
        assert!(matches!(
            source.next_event().await,
            Some(Ok(InboundEvent::Shutdown))
        ));
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn last_line_without_newline_is_read() {
        let input = b"\n{\"type\":\"shutdown\"}";
        let mut source = LineSource::new(&input[..]);
        assert!(matches!(
            source.next_event().await,
            Some(Ok(InboundEvent::Shutdown))
        ));
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn writes_one_line_per_reply() {
        let mut sink = LineSink::new(Vec::new());
        sink.send(&OutboundReply::ToolResult {
            call_id: "c1".into(),
            content: "line one\nline two".into(),
        })
        .await
        .unwrap();
        sink.send(&OutboundReply::Error {
            message: "bad".into(),
        })
        .await
        .unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"call_id\":\"c1\""));
        assert!(lines[1].starts_with("{\"type\":\"error\""));
    }
}
