//! Low-level async netlink socket operations.

use std::fs::File;
use std::future::Future;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::error::{Error, Result};

/// Receive buffer size. Large rulesets are dumped in multi-part replies that
/// routinely exceed a page.
const RECV_BUF_SIZE: usize = 64 * 1024;

/// Byte transport used by [`Connection`](super::Connection) and monitors.
///
/// [`NetlinkSocket`] is the production implementation. A transport reports
/// a locally closed socket as [`Error::ConnectionClosed`] rather than as an
/// I/O error so that callers can tell an orderly shutdown from a failure.
pub trait Transport: Send + Sync + 'static {
    /// Local port ID.
    fn pid(&self) -> u32;

    /// Get the next sequence number.
    fn next_seq(&self) -> u32;

    /// Subscribe to a multicast group.
    fn add_membership(&mut self, group: u32) -> Result<()>;

    /// Send one datagram.
    fn send(&self, msg: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Receive one datagram, which may hold several netlink messages.
    fn recv_msg(&self) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Async `NETLINK_NETFILTER` socket.
pub struct NetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    pid: u32,
}

impl NetlinkSocket {
    /// Create a new netfilter netlink socket.
    pub fn new() -> Result<Self> {
        Self::create_socket()
    }

    /// Create a netlink socket that operates in a specific network namespace.
    ///
    /// The namespace is specified by an open file descriptor to a namespace file
    /// (e.g., `/proc/<pid>/ns/net` or `/var/run/netns/<name>`).
    ///
    /// This temporarily switches the calling thread to the target namespace,
    /// creates the socket, then restores the original namespace.
    pub fn new_in_namespace(ns_fd: RawFd) -> Result<Self> {
        let current_ns = File::open("/proc/self/ns/net")
            .map_err(|e| Error::InvalidMessage(format!("cannot open current namespace: {}", e)))?;
        let current_ns_fd = current_ns.as_raw_fd();

        // SAFETY: ns_fd is a valid file descriptor to a namespace file.
        let ret = unsafe { libc::setns(ns_fd, libc::CLONE_NEWNET) };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        let result = Self::create_socket();

        // SAFETY: current_ns_fd was opened from /proc/self/ns/net above.
        let restore_ret = unsafe { libc::setns(current_ns_fd, libc::CLONE_NEWNET) };
        if restore_ret < 0 {
            tracing::warn!(
                error = %std::io::Error::last_os_error(),
                "failed to restore original network namespace"
            );
        }

        result
    }

    /// Create a netlink socket in the network namespace at `ns_path`.
    ///
    /// ```ignore
    /// use nftlink::netlink::NetlinkSocket;
    ///
    /// let socket = NetlinkSocket::new_in_namespace_path("/var/run/netns/fw")?;
    /// ```
    pub fn new_in_namespace_path<P: AsRef<Path>>(ns_path: P) -> Result<Self> {
        let ns_file = File::open(ns_path.as_ref()).map_err(|e| {
            Error::InvalidMessage(format!(
                "cannot open namespace '{}': {}",
                ns_path.as_ref().display(),
                e
            ))
        })?;
        Self::new_in_namespace(ns_file.as_raw_fd())
    }

    fn create_socket() -> Result<Self> {
        let mut socket = Socket::new(protocols::NETLINK_NETFILTER)?;
        socket.set_non_blocking(true)?;

        // Bind to get a port ID
        let mut addr = SocketAddr::new(0, 0);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;
        let pid = addr.port_number();

        // Extended ACK gives better error messages; older kernels lack it.
        socket.set_ext_ack(true).ok();

        let fd = AsyncFd::with_interest(socket, Interest::READABLE | Interest::WRITABLE)?;

        Ok(Self {
            fd,
            seq: AtomicU32::new(1),
            pid,
        })
    }
}

/// Map errors that mean "this descriptor is gone" onto the closed sentinel.
fn classify(err: std::io::Error) -> Error {
    match err.raw_os_error() {
        Some(libc::EBADF) | Some(libc::ENOTCONN) => Error::ConnectionClosed,
        _ => Error::Io(err),
    }
}

impl Transport for NetlinkSocket {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn add_membership(&mut self, group: u32) -> Result<()> {
        self.fd.get_mut().add_membership(group)?;
        Ok(())
    }

    async fn send(&self, msg: &[u8]) -> Result<()> {
        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await.map_err(classify)?;

            match guard.try_io(|inner| inner.get_ref().send(msg, 0)) {
                Ok(result) => {
                    result.map_err(classify)?;
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }

    async fn recv_msg(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(RECV_BUF_SIZE);

        loop {
            let mut guard = self.fd.ready(Interest::READABLE).await.map_err(classify)?;

            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, 0)) {
                Ok(result) => {
                    result.map_err(classify)?;
                    // buf has been advanced by recv, so buf[..] contains the data
                    return Ok(buf.to_vec());
                }
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}
