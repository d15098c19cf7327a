//! Scripted transport and message helpers for unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::error::{Error, Result};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, NlMsgType, nlmsg_align};
use super::socket::Transport;

struct Inner {
    seq: AtomicU32,
    sent: Mutex<Vec<Vec<u8>>>,
    groups: Mutex<Vec<u32>>,
    tx: mpsc::UnboundedSender<Result<Vec<u8>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Vec<u8>>>>,
}

/// In-memory [`Transport`]: records what is sent and replays queued
/// datagrams. `recv_msg` waits until something is queued.
#[derive(Clone)]
pub(crate) struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                seq: AtomicU32::new(1),
                sent: Mutex::new(Vec::new()),
                groups: Mutex::new(Vec::new()),
                tx,
                rx: tokio::sync::Mutex::new(rx),
            }),
        }
    }

    /// Queue one datagram for `recv_msg`.
    pub(crate) fn push_recv(&self, data: Vec<u8>) {
        let _ = self.inner.tx.send(Ok(data));
    }

    /// Queue a receive failure.
    pub(crate) fn push_error(&self, err: Error) {
        let _ = self.inner.tx.send(Err(err));
    }

    /// Every datagram passed to `send`, in order.
    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// Multicast groups joined so far.
    pub(crate) fn groups(&self) -> Vec<u32> {
        self.inner.groups.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn pid(&self) -> u32 {
        4242
    }

    fn next_seq(&self) -> u32 {
        self.inner.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn add_membership(&mut self, group: u32) -> Result<()> {
        self.inner.groups.lock().unwrap().push(group);
        Ok(())
    }

    async fn send(&self, msg: &[u8]) -> Result<()> {
        self.inner.sent.lock().unwrap().push(msg.to_vec());
        Ok(())
    }

    async fn recv_msg(&self) -> Result<Vec<u8>> {
        let mut rx = self.inner.rx.lock().await;
        rx.recv().await.unwrap_or(Err(Error::ConnectionClosed))
    }
}

/// Encode one netlink message.
pub(crate) fn reply(msg_type: u16, flags: u16, seq: u32, payload: &[u8]) -> Vec<u8> {
    let mut hdr = NlMsgHdr::new(msg_type, flags);
    hdr.nlmsg_len = (NLMSG_HDRLEN + payload.len()) as u32;
    hdr.nlmsg_seq = seq;
    let mut buf = hdr.as_bytes().to_vec();
    buf.extend_from_slice(payload);
    buf.resize(nlmsg_align(buf.len()), 0);
    buf
}

/// `NLMSG_ERROR` carrying `errno` (negative, or 0 for an ACK).
pub(crate) fn error_reply(seq: u32, errno: i32) -> Vec<u8> {
    let mut payload = errno.to_ne_bytes().to_vec();
    payload.extend_from_slice(NlMsgHdr::new(0, 0).as_bytes());
    reply(NlMsgType::ERROR, 0, seq, &payload)
}

pub(crate) fn ack(seq: u32) -> Vec<u8> {
    error_reply(seq, 0)
}

pub(crate) fn done(seq: u32) -> Vec<u8> {
    reply(NlMsgType::DONE, 0, seq, &0i32.to_ne_bytes())
}
