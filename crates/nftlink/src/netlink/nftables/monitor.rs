//! Ruleset change notifications.
//!
//! The kernel broadcasts every nftables change on one multicast group. A
//! [`Monitor`] joins that group on its own socket, filters the messages by
//! type, decodes them and hands them out in kernel order through a bounded
//! channel.
//!
//! # Example
//!
//! ```ignore
//! use nftlink::netlink::Connection;
//! use nftlink::netlink::nftables::{Monitor, MonitorAction, MonitorEventData, MonitorObject};
//!
//! let conn = Connection::new()?;
//! let monitor = Monitor::builder()
//!     .action(MonitorAction::New)
//!     .object(MonitorObject::Tables)
//!     .event_buffer(16)
//!     .build();
//!
//! let mut events = conn.add_monitor(&monitor)?;
//! while let Some(event) = events.recv().await {
//!     match event.data {
//!         Ok(MonitorEventData::Table(table)) => println!("new table {}", table.name),
//!         Ok(other) => println!("{:?}", other),
//!         Err(e) => eprintln!("{:?}: {}", event.event_type, e),
//!     }
//! }
//! ```
//!
//! A monitor is single use: once closed, or once its transport fails, a new
//! one has to be built.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};
use tokio_stream::Stream;

use super::chain::{Chain, chain_from_msg};
use super::obj::{Obj, obj_from_msg};
use super::rule::{Rule, rule_from_msg};
use super::set::{Set, SetElement, elements_from_msg, set_from_msg};
use super::table::{Table, table_from_msg};
use super::{NFNL_SUBSYS_NFTABLES, NFNLGRP_NFTABLES, msg};
use crate::netlink::connection::Connection;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{MessageIter, NlMsgHdr};
use crate::netlink::socket::{NetlinkSocket, Transport};

/// Kind of change to watch for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MonitorAction {
    /// Additions.
    New,
    /// Deletions.
    Del,
    /// Additions and deletions.
    #[default]
    Any,
}

impl MonitorAction {
    /// Bit value (`New | Del == Any`).
    pub fn bits(&self) -> u8 {
        match self {
            Self::New => 1 << 0,
            Self::Del => 1 << 1,
            Self::Any => (1 << 0) | (1 << 1),
        }
    }
}

/// Kind of object to watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MonitorObject {
    /// Tables.
    Tables,
    /// Chains.
    Chains,
    /// Sets.
    Sets,
    /// Rules.
    Rules,
    /// Set elements.
    Elements,
    /// The whole ruleset, stateful objects included.
    Ruleset,
    /// Everything.
    #[default]
    Any,
}

impl MonitorObject {
    /// Bit value (`Any` is the union of all others).
    pub fn bits(&self) -> u32 {
        match self {
            Self::Tables => 1 << 0,
            Self::Chains => 1 << 1,
            Self::Sets => 1 << 2,
            Self::Rules => 1 << 3,
            Self::Elements => 1 << 4,
            Self::Ruleset => 1 << 5,
            Self::Any => (1 << 6) - 1,
        }
    }
}

const fn bit(msg_type: u8) -> u32 {
    1 << msg_type
}

/// Maps `(action, object)` to the set of `NFT_MSG_*` types to deliver.
///
/// Pairs missing from the table resolve through the `Any` row and then the
/// `Any` column, so every lookup yields some mask.
#[derive(Debug, Clone, Default)]
pub struct MonitorFlagTable {
    rows: HashMap<MonitorAction, HashMap<MonitorObject, u32>>,
}

static STANDARD_FLAGS: LazyLock<Arc<MonitorFlagTable>> =
    LazyLock::new(|| Arc::new(MonitorFlagTable::build_standard()));

impl MonitorFlagTable {
    /// Create an empty table. Every lookup in it resolves to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mask for one pair.
    pub fn with(mut self, action: MonitorAction, object: MonitorObject, flags: u32) -> Self {
        self.rows.entry(action).or_default().insert(object, flags);
        self
    }

    /// The table used unless a monitor is given another one.
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD_FLAGS)
    }

    fn build_standard() -> Self {
        use MonitorAction as A;
        use MonitorObject as O;

        let new_all = bit(msg::NEWTABLE)
            | bit(msg::NEWCHAIN)
            | bit(msg::NEWRULE)
            | bit(msg::NEWSET)
            | bit(msg::NEWSETELEM);
        let del_all = bit(msg::DELTABLE)
            | bit(msg::DELCHAIN)
            | bit(msg::DELRULE)
            | bit(msg::DELSET)
            | bit(msg::DELSETELEM)
            | bit(msg::DELOBJ);
        let ruleset = new_all | bit(msg::NEWOBJ) | del_all;

        Self::new()
            .with(A::Any, O::Any, 0xffff_ffff)
            .with(A::Any, O::Tables, bit(msg::NEWTABLE) | bit(msg::DELTABLE))
            .with(A::Any, O::Chains, bit(msg::NEWCHAIN) | bit(msg::DELCHAIN))
            .with(A::Any, O::Rules, bit(msg::NEWRULE) | bit(msg::DELRULE))
            .with(A::Any, O::Sets, bit(msg::NEWSET) | bit(msg::DELSET))
            .with(A::Any, O::Elements, bit(msg::NEWSETELEM) | bit(msg::DELSETELEM))
            .with(A::Any, O::Ruleset, ruleset)
            .with(A::New, O::Any, new_all)
            .with(A::New, O::Tables, bit(msg::NEWTABLE))
            .with(A::New, O::Chains, bit(msg::NEWCHAIN))
            .with(A::New, O::Rules, bit(msg::NEWRULE))
            .with(A::New, O::Sets, bit(msg::NEWSET))
            .with(A::New, O::Ruleset, new_all | bit(msg::NEWOBJ))
            .with(A::Del, O::Any, del_all)
    }

    /// Resolve the message type mask for `(action, object)`.
    pub fn resolve(&self, action: MonitorAction, object: MonitorObject) -> u32 {
        let row = match self.rows.get(&action) {
            Some(row) => row,
            None => {
                tracing::debug!(?action, "no monitor flags for action, using Any");
                match self.rows.get(&MonitorAction::Any) {
                    Some(row) => row,
                    None => return 0,
                }
            }
        };

        match row.get(&object) {
            Some(flags) => *flags,
            None => {
                tracing::debug!(?action, ?object, "no monitor flags for object, using Any");
                row.get(&MonitorObject::Any).copied().unwrap_or(0)
            }
        }
    }
}

/// Type of a [`MonitorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MonitorEventType {
    NewTable,
    DelTable,
    NewChain,
    DelChain,
    NewRule,
    DelRule,
    NewSet,
    DelSet,
    NewSetElem,
    DelSetElem,
    NewObj,
    DelObj,
    /// Out of band: the transport failed and the monitor stopped.
    Oob,
}

impl MonitorEventType {
    /// Event type for an `NFT_MSG_*` value, if it is one that is reported.
    pub fn from_msg_type(msg_type: u8) -> Option<Self> {
        Some(match msg_type {
            msg::NEWTABLE => Self::NewTable,
            msg::DELTABLE => Self::DelTable,
            msg::NEWCHAIN => Self::NewChain,
            msg::DELCHAIN => Self::DelChain,
            msg::NEWRULE => Self::NewRule,
            msg::DELRULE => Self::DelRule,
            msg::NEWSET => Self::NewSet,
            msg::DELSET => Self::DelSet,
            msg::NEWSETELEM => Self::NewSetElem,
            msg::DELSETELEM => Self::DelSetElem,
            msg::NEWOBJ => Self::NewObj,
            msg::DELOBJ => Self::DelObj,
            _ => return None,
        })
    }

    /// Whether this reports an addition.
    pub fn is_new(&self) -> bool {
        matches!(
            self,
            Self::NewTable
                | Self::NewChain
                | Self::NewRule
                | Self::NewSet
                | Self::NewSetElem
                | Self::NewObj
        )
    }

    /// Whether this reports a deletion.
    pub fn is_del(&self) -> bool {
        !self.is_new() && *self != Self::Oob
    }
}

/// Decoded payload of a [`MonitorEvent`]. The variant follows from the
/// event type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MonitorEventData {
    Table(Table),
    Chain(Chain),
    Rule(Rule),
    Set(Set),
    SetElements(Vec<SetElement>),
    Obj(Obj),
}

/// One ruleset change, or the error that stopped the monitor.
#[derive(Debug)]
pub struct MonitorEvent {
    /// What happened.
    pub event_type: MonitorEventType,
    /// Decoded object, or why decoding (or receiving) failed.
    pub data: Result<MonitorEventData>,
}

impl MonitorEvent {
    /// Whether this is the final event reporting a transport failure.
    pub fn is_oob(&self) -> bool {
        self.event_type == MonitorEventType::Oob
    }
}

/// Configuration for [`Monitor::new`].
#[derive(Debug, Clone)]
pub enum MonitorOption {
    /// Kind of change to report. Defaults to [`MonitorAction::Any`].
    Action(MonitorAction),
    /// Kind of object to report. Defaults to [`MonitorObject::Any`].
    Object(MonitorObject),
    /// Event channel capacity. Defaults to 1; zero is treated as 1.
    EventBuffer(usize),
    /// Flag table to resolve action and object against.
    FlagTable(Arc<MonitorFlagTable>),
}

/// Builder for a [`Monitor`].
#[derive(Debug, Default)]
pub struct MonitorBuilder {
    options: Vec<MonitorOption>,
}

impl MonitorBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report only this kind of change.
    pub fn action(mut self, action: MonitorAction) -> Self {
        self.options.push(MonitorOption::Action(action));
        self
    }

    /// Report only this kind of object.
    pub fn object(mut self, object: MonitorObject) -> Self {
        self.options.push(MonitorOption::Object(object));
        self
    }

    /// Buffer up to `size` undelivered events.
    pub fn event_buffer(mut self, size: usize) -> Self {
        self.options.push(MonitorOption::EventBuffer(size));
        self
    }

    /// Resolve against `table` instead of the standard flag table.
    pub fn flag_table(mut self, table: Arc<MonitorFlagTable>) -> Self {
        self.options.push(MonitorOption::FlagTable(table));
        self
    }

    /// Build the monitor.
    pub fn build(self) -> Monitor {
        Monitor::new(self.options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorStatus {
    Constructed,
    Running,
    Closed,
}

#[derive(Debug)]
struct MonitorState {
    status: MonitorStatus,
    shutdown: Option<oneshot::Sender<()>>,
}

/// A subscription to nftables change notifications.
#[derive(Debug)]
pub struct Monitor {
    action: MonitorAction,
    object: MonitorObject,
    monitor_flags: u32,
    capacity: usize,
    state: Arc<Mutex<MonitorState>>,
}

fn lock(state: &Mutex<MonitorState>) -> MutexGuard<'_, MonitorState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl Monitor {
    /// Create a monitor from `options`. Later options override earlier ones.
    pub fn new(options: impl IntoIterator<Item = MonitorOption>) -> Self {
        let mut action = MonitorAction::Any;
        let mut object = MonitorObject::Any;
        let mut capacity = 1;
        let mut table = None;

        for option in options {
            match option {
                MonitorOption::Action(a) => action = a,
                MonitorOption::Object(o) => object = o,
                MonitorOption::EventBuffer(size) => capacity = size.max(1),
                MonitorOption::FlagTable(t) => table = Some(t),
            }
        }

        let table = table.unwrap_or_else(MonitorFlagTable::standard);

        Self {
            action,
            object,
            monitor_flags: table.resolve(action, object),
            capacity,
            state: Arc::new(Mutex::new(MonitorState {
                status: MonitorStatus::Constructed,
                shutdown: None,
            })),
        }
    }

    /// Create a builder for configuring a monitor.
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Configured action.
    pub fn action(&self) -> MonitorAction {
        self.action
    }

    /// Configured object.
    pub fn object(&self) -> MonitorObject {
        self.object
    }

    /// Mask of `NFT_MSG_*` types that are delivered (bit n = type n).
    pub fn monitor_flags(&self) -> u32 {
        self.monitor_flags
    }

    /// Whether the monitor has been closed or has stopped on its own.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).status == MonitorStatus::Closed
    }

    /// Start monitoring on `transport`, which the monitor takes over.
    ///
    /// Joins the nftables multicast group (unless the mask is empty) and
    /// spawns the receive task on the current tokio runtime. Fails with
    /// [`Error::MonitorUnavailable`] if the monitor was already subscribed
    /// or closed.
    pub fn subscribe<T: Transport>(&self, mut transport: T) -> Result<MonitorEvents> {
        let mut state = lock(&self.state);
        if state.status != MonitorStatus::Constructed {
            return Err(Error::MonitorUnavailable);
        }

        if self.monitor_flags != 0 {
            transport.add_membership(NFNLGRP_NFTABLES)?;
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        state.status = MonitorStatus::Running;
        state.shutdown = Some(shutdown_tx);
        drop(state);

        tokio::spawn(receive_loop(
            transport,
            self.monitor_flags,
            tx,
            shutdown_rx,
            Arc::clone(&self.state),
        ));

        Ok(MonitorEvents { rx })
    }

    /// Stop monitoring.
    ///
    /// The receive task notices, releases its socket and closes the event
    /// channel. Calling this again, or after the monitor stopped on its own,
    /// does nothing.
    ///
    /// This never fails: the socket is owned and dropped by the receive
    /// task, so there is no close error to report here. Receive failures
    /// surface as an out-of-band event instead.
    pub fn close(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.status != MonitorStatus::Closed {
            state.status = MonitorStatus::Closed;
            if let Some(shutdown) = state.shutdown.take() {
                let _ = shutdown.send(());
            }
        }
        Ok(())
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new([])
    }
}

impl<T: Transport> Connection<T> {
    /// Start `monitor` on a dedicated socket.
    ///
    /// The socket is opened in the same network namespace as this
    /// connection. Must be called from within a tokio runtime.
    pub fn add_monitor(&self, monitor: &Monitor) -> Result<MonitorEvents> {
        let socket = match self.namespace_path() {
            Some(path) => NetlinkSocket::new_in_namespace_path(path)?,
            None => NetlinkSocket::new()?,
        };
        monitor.subscribe(socket)
    }
}

async fn receive_loop<T: Transport>(
    transport: T,
    flags: u32,
    tx: mpsc::Sender<MonitorEvent>,
    mut shutdown: oneshot::Receiver<()>,
    state: Arc<Mutex<MonitorState>>,
) {
    tracing::debug!(flags = format_args!("{:#x}", flags), "nftables monitor started");

    'recv: loop {
        let result = tokio::select! {
            _ = &mut shutdown => break 'recv,
            _ = tx.closed() => break 'recv,
            result = transport.recv_msg() => result,
        };

        let data = match result {
            Ok(data) => data,
            Err(Error::ConnectionClosed) => break 'recv,
            Err(e) => {
                tracing::warn!(error = %e, "nftables monitor receive failed");
                let event = MonitorEvent {
                    event_type: MonitorEventType::Oob,
                    data: Err(e),
                };
                let _ = tx.send(event).await;
                break 'recv;
            }
        };

        for result in MessageIter::new(&data) {
            let (hdr, payload) = match result {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed netlink datagram");
                    break;
                }
            };

            let Some(event) = decode_event(&hdr, payload, flags) else {
                continue;
            };

            tokio::select! {
                _ = &mut shutdown => break 'recv,
                sent = tx.send(event) => {
                    if sent.is_err() {
                        break 'recv;
                    }
                }
            }
        }
    }

    let mut state = lock(&state);
    state.status = MonitorStatus::Closed;
    state.shutdown = None;
    drop(tx);
    drop(state);

    tracing::debug!("nftables monitor stopped");
}

/// Filter and decode one notification.
fn decode_event(hdr: &NlMsgHdr, payload: &[u8], flags: u32) -> Option<MonitorEvent> {
    if hdr.subsystem() != NFNL_SUBSYS_NFTABLES {
        tracing::trace!(nlmsg_type = hdr.nlmsg_type, "skipping non-nftables message");
        return None;
    }

    let msg_type = hdr.subsystem_msg();
    let wanted = 1u32
        .checked_shl(u32::from(msg_type))
        .is_some_and(|b| flags & b != 0);
    if !wanted {
        tracing::trace!(msg_type, "skipping filtered nftables message");
        return None;
    }

    let event_type = MonitorEventType::from_msg_type(msg_type)?;
    let data = match msg_type {
        msg::NEWTABLE | msg::DELTABLE => table_from_msg(hdr, payload).map(MonitorEventData::Table),
        msg::NEWCHAIN | msg::DELCHAIN => chain_from_msg(hdr, payload).map(MonitorEventData::Chain),
        msg::NEWRULE | msg::DELRULE => rule_from_msg(hdr, payload).map(MonitorEventData::Rule),
        msg::NEWSET | msg::DELSET => set_from_msg(hdr, payload).map(MonitorEventData::Set),
        msg::NEWSETELEM | msg::DELSETELEM => {
            elements_from_msg(hdr, payload).map(MonitorEventData::SetElements)
        }
        _ => obj_from_msg(hdr, payload).map(MonitorEventData::Obj),
    };

    Some(MonitorEvent { event_type, data })
}

/// Receiving end of a monitor's event channel.
///
/// The channel closes when the monitor stops. If the last event before that
/// is an [`Oob`](MonitorEventType::Oob) event, the transport failed;
/// otherwise the monitor was closed.
#[derive(Debug)]
pub struct MonitorEvents {
    rx: mpsc::Receiver<MonitorEvent>,
}

impl MonitorEvents {
    /// Wait for the next event. `None` once the monitor has stopped.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        self.rx.recv().await
    }

    /// Get the underlying channel receiver.
    pub fn into_inner(self) -> mpsc::Receiver<MonitorEvent> {
        self.rx
    }
}

impl Stream for MonitorEvents {
    type Item = MonitorEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
