//! High-level netlink connection with request/response handling.
//!
//! nftables mutations are transactional: requests are queued on the
//! connection and only reach the kernel when [`Connection::flush`] commits
//! them as one batch.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{MessageIter, NLM_F_REQUEST, NlMsgError, NlMsgHdr, NlMsgType};
use super::nftables::header::extra_header;
use super::nftables::NFNL_SUBSYS_NFTABLES;
use super::socket::{NetlinkSocket, Transport};

/// High-level nftables connection.
///
/// Generic over the [`Transport`] so that tests can drive it without a
/// kernel; in normal use the default [`NetlinkSocket`] is used.
pub struct Connection<T: Transport = NetlinkSocket> {
    transport: T,
    /// Requests queued by `add_*`/`del_*` calls, sent by `flush`.
    pending: Mutex<Vec<MessageBuilder>>,
    /// Namespace the transport was opened in, reused for monitor sockets.
    namespace: Option<PathBuf>,
}

impl Connection<NetlinkSocket> {
    /// Create a new connection in the current network namespace.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use nftlink::netlink::Connection;
    ///
    /// let conn = Connection::new()?;
    /// for table in conn.list_tables().await? {
    ///     println!("{} {}", table.family, table.name);
    /// }
    /// ```
    pub fn new() -> Result<Self> {
        Ok(Self::from_transport(NetlinkSocket::new()?))
    }

    /// Create a connection that operates in a network namespace specified by path.
    ///
    /// ```ignore
    /// // For a named namespace (created via `ip netns add fw`)
    /// let conn = Connection::new_in_namespace_path("/var/run/netns/fw")?;
    ///
    /// // For a container's namespace
    /// let conn = Connection::new_in_namespace_path("/proc/1234/ns/net")?;
    /// ```
    pub fn new_in_namespace_path<P: AsRef<Path>>(ns_path: P) -> Result<Self> {
        let mut conn = Self::from_transport(NetlinkSocket::new_in_namespace_path(&ns_path)?);
        conn.namespace = Some(ns_path.as_ref().to_path_buf());
        Ok(conn)
    }
}

impl<T: Transport> Connection<T> {
    /// Wrap an already opened transport.
    pub fn from_transport(transport: T) -> Self {
        Self {
            transport,
            pending: Mutex::new(Vec::new()),
            namespace: None,
        }
    }

    /// Network namespace path this connection was opened in, if any.
    pub fn namespace_path(&self) -> Option<&Path> {
        self.namespace.as_deref()
    }

    /// Lock the pending buffer. A poisoned lock only means another builder
    /// panicked mid-push; the queued messages themselves are still whole.
    fn pending(&self) -> MutexGuard<'_, Vec<MessageBuilder>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a request for the next [`flush`](Self::flush).
    pub(crate) fn queue(&self, builder: MessageBuilder) {
        tracing::debug!(
            msg_type = format_args!("{:#06x}", builder.msg_type()),
            flags = format_args!("{:#x}", builder.flags()),
            "queued nftables request"
        );
        self.pending().push(builder);
    }

    /// Number of requests waiting for the next [`flush`](Self::flush).
    pub fn pending_len(&self) -> usize {
        self.pending().len()
    }

    #[cfg(test)]
    pub(crate) fn take_pending(&self) -> Vec<MessageBuilder> {
        std::mem::take(&mut *self.pending())
    }

    /// Send a request and collect every reply until `NLMSG_DONE`.
    ///
    /// Requests sent with `NLM_F_DUMP` are answered with a multi-part
    /// sequence; a plain `GET` gets a single reply followed by an ACK or an
    /// error. Both shapes are handled. Replies are returned as
    /// (header, payload) pairs.
    pub async fn dump(&self, mut builder: MessageBuilder) -> Result<Vec<(NlMsgHdr, Vec<u8>)>> {
        let seq = self.transport.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.transport.pid());

        let msg = builder.finish();
        self.transport.send(&msg).await?;

        let mut responses = Vec::new();

        loop {
            let data = self.transport.recv_msg().await?;
            let mut done = false;

            for result in MessageIter::new(&data) {
                let (header, payload) = result?;

                // Check sequence number
                if header.nlmsg_seq != seq {
                    continue;
                }

                if header.is_error() {
                    let err = NlMsgError::parse(payload)?;
                    if !err.is_ack() {
                        return Err(Error::from_errno(err.error));
                    }
                    done = true;
                    break;
                }

                if header.is_done() {
                    done = true;
                    break;
                }

                responses.push((header, payload.to_vec()));

                if !header.is_multi() {
                    done = true;
                    break;
                }
            }

            if done {
                break;
            }
        }

        Ok(responses)
    }

    /// Commit every queued request to the kernel as one transaction.
    ///
    /// The queued messages are wrapped in `NFNL_MSG_BATCH_BEGIN` and
    /// `NFNL_MSG_BATCH_END` and sent as a single datagram. The kernel applies
    /// the batch atomically and answers each message with an ACK or an error;
    /// the first error is returned, tagged with the type of the rejected
    /// message. The queue is emptied either way.
    pub async fn flush(&self) -> Result<()> {
        let batch = std::mem::take(&mut *self.pending());
        if batch.is_empty() {
            return Ok(());
        }

        let pid = self.transport.pid();
        let mut expected = Vec::with_capacity(batch.len());
        let mut buf = Vec::new();

        let mut begin = batch_marker(NlMsgType::NFNL_BATCH_BEGIN);
        let first_seq = self.transport.next_seq();
        begin.set_seq(first_seq);
        begin.set_pid(pid);
        buf.extend(begin.finish());

        for mut builder in batch {
            let seq = self.transport.next_seq();
            builder.set_seq(seq);
            builder.set_pid(pid);
            expected.push((seq, builder.msg_type()));
            buf.extend(builder.finish());
        }

        let mut end = batch_marker(NlMsgType::NFNL_BATCH_END);
        let last_seq = self.transport.next_seq();
        end.set_seq(last_seq);
        end.set_pid(pid);
        buf.extend(end.finish());

        tracing::debug!(messages = expected.len(), bytes = buf.len(), "committing nftables batch");
        self.transport.send(&buf).await?;

        while !expected.is_empty() {
            let response = self.transport.recv_msg().await?;
            for result in MessageIter::new(&response) {
                let (header, payload) = result?;
                let seq = header.nlmsg_seq;

                if !header.is_error() || seq < first_seq || seq > last_seq {
                    continue;
                }

                let err = NlMsgError::parse(payload)?;
                if !err.is_ack() {
                    tracing::debug!(seq, errno = -err.error, "nftables batch rejected");
                    let rejected = expected.iter().find(|(s, _)| *s == seq).map(|(_, t)| *t);
                    let operation = match rejected {
                        Some(t) => format!("commit nftables batch (message {t:#06x})"),
                        None => "commit nftables batch".to_string(),
                    };
                    return Err(Error::from_errno(err.error).with_context(operation));
                }
                expected.retain(|&(s, _)| s != seq);
            }
        }

        Ok(())
    }
}

/// Build a batch delimiter addressed to the nftables subsystem.
fn batch_marker(msg_type: u16) -> MessageBuilder {
    let mut builder = MessageBuilder::new(msg_type, NLM_F_REQUEST);
    builder.append_bytes(&extra_header(
        libc::AF_UNSPEC as u8,
        NFNL_SUBSYS_NFTABLES as u16,
    ));
    builder
}
