//! nft monitor - watch ruleset changes.
//!
//! Uses the nftlink `Monitor` with its `Stream` support.

use clap::{Args, ValueEnum};
use nftlink::netlink::Connection;
use nftlink::netlink::nftables::{
    Monitor, MonitorAction, MonitorEvent, MonitorEventData, MonitorEventType, MonitorObject,
};
use std::io::Write;
use tokio_stream::StreamExt;

use crate::output::{OutputFormat, OutputOptions, Printable, write_json, write_timestamp};

/// Kind of change to report.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Action {
    /// Additions.
    New,
    /// Deletions.
    Destroy,
    /// Both.
    All,
}

impl Action {
    fn to_nftlink(self) -> MonitorAction {
        match self {
            Action::New => MonitorAction::New,
            Action::Destroy => MonitorAction::Del,
            Action::All => MonitorAction::Any,
        }
    }
}

/// Kind of object to report.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Object {
    Tables,
    Chains,
    Sets,
    Rules,
    Elements,
    Ruleset,
    All,
}

impl Object {
    fn to_nftlink(self) -> MonitorObject {
        match self {
            Object::Tables => MonitorObject::Tables,
            Object::Chains => MonitorObject::Chains,
            Object::Sets => MonitorObject::Sets,
            Object::Rules => MonitorObject::Rules,
            Object::Elements => MonitorObject::Elements,
            Object::Ruleset => MonitorObject::Ruleset,
            Object::All => MonitorObject::Any,
        }
    }
}

#[derive(Args)]
pub struct MonitorCmd {
    /// Kind of change to report.
    #[arg(value_enum, default_value = "all")]
    action: Action,

    /// Kind of object to report.
    #[arg(value_enum, default_value = "all")]
    object: Object,

    /// Number of events to buffer while printing.
    #[arg(short = 'b', long, default_value_t = 64)]
    buffer: usize,

    /// Label output lines with event timestamps.
    #[arg(short = 't', long)]
    timestamp: bool,
}

impl MonitorCmd {
    pub async fn run(
        &self,
        conn: &Connection,
        format: OutputFormat,
        opts: &OutputOptions,
    ) -> nftlink::Result<()> {
        let opts = OutputOptions {
            timestamp: self.timestamp,
            ..*opts
        };

        let monitor = Monitor::builder()
            .action(self.action.to_nftlink())
            .object(self.object.to_nftlink())
            .event_buffer(self.buffer)
            .build();
        let mut events = conn.add_monitor(&monitor)?;

        if format == OutputFormat::Text {
            eprintln!("Monitoring nftables events (Ctrl+C to stop)...");
        }

        let mut stdout = std::io::stdout().lock();
        while let Some(event) = events.next().await {
            if event.is_oob() {
                if let Err(e) = event.data {
                    return Err(e);
                }
                break;
            }

            write_timestamp(&mut stdout, &opts)?;
            match format {
                OutputFormat::Text => event.print_text(&mut stdout)?,
                OutputFormat::Json => write_json(&mut stdout, &event.to_json(), &opts)?,
            }
            stdout.flush()?;
        }

        monitor.close()
    }
}

fn action_name(event_type: MonitorEventType) -> &'static str {
    if event_type.is_new() { "add" } else { "delete" }
}

impl Printable for MonitorEvent {
    fn print_text<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let action = action_name(self.event_type);
        let data = match &self.data {
            Ok(data) => data,
            Err(e) => return writeln!(w, "{} {:?}: decode error: {}", action, self.event_type, e),
        };

        match data {
            MonitorEventData::Table(t) => writeln!(w, "{} table {} {}", action, t.family, t.name),
            MonitorEventData::Chain(c) => writeln!(
                w,
                "{} chain {} {} {}",
                action, c.table.family, c.table.name, c.name
            ),
            MonitorEventData::Rule(r) => {
                write!(
                    w,
                    "{} rule {} {} {}",
                    action, r.table.family, r.table.name, r.chain
                )?;
                for expr in &r.exprs {
                    write!(w, " {}", expr)?;
                }
                writeln!(w, " # handle {}", r.handle)
            }
            MonitorEventData::Set(s) => writeln!(
                w,
                "{} set {} {} {}",
                action, s.table.family, s.table.name, s.name
            ),
            MonitorEventData::SetElements(elements) => {
                writeln!(w, "{} element ({} elements)", action, elements.len())
            }
            MonitorEventData::Obj(obj) => {
                write!(w, "{} ", action)?;
                obj.print_text(w)
            }
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let mut json = serde_json::json!({ "type": self.event_type });
        match &self.data {
            Ok(data) => json["data"] = serde_json::to_value(data).unwrap_or_default(),
            Err(e) => json["error"] = serde_json::Value::String(e.to_string()),
        }
        json
    }
}
