//! Text and JSON output.

use std::io::Write;
use std::time::SystemTime;

use nftlink::netlink::nftables::{Obj, Table};

/// Output options.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Pretty print (for JSON).
    pub pretty: bool,
    /// Prefix monitor lines with a timestamp.
    pub timestamp: bool,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

/// Trait for types that can be printed.
pub trait Printable {
    /// Print as plain text.
    fn print_text<W: Write>(&self, w: &mut W) -> std::io::Result<()>;

    /// Convert to JSON value.
    fn to_json(&self) -> serde_json::Value;
}

/// Write one JSON value followed by a newline.
pub fn write_json<W: Write>(
    w: &mut W,
    json: &serde_json::Value,
    opts: &OutputOptions,
) -> std::io::Result<()> {
    if opts.pretty {
        serde_json::to_writer_pretty(&mut *w, json)?;
    } else {
        serde_json::to_writer(&mut *w, json)?;
    }
    writeln!(w)
}

/// Print one item in the specified format.
pub fn print_one<W: Write, P: Printable>(
    w: &mut W,
    item: &P,
    format: OutputFormat,
    opts: &OutputOptions,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => item.print_text(w),
        OutputFormat::Json => write_json(w, &item.to_json(), opts),
    }
}

/// Print a list of items; JSON output is a single array.
pub fn print_all<W: Write, P: Printable>(
    w: &mut W,
    items: &[P],
    format: OutputFormat,
    opts: &OutputOptions,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => {
            for item in items {
                item.print_text(w)?;
            }
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::Value::Array(items.iter().map(Printable::to_json).collect());
            write_json(w, &json, opts)
        }
    }
}

/// Write a timestamp prefix if enabled.
///
/// Format: `[seconds.milliseconds] `
pub fn write_timestamp<W: Write>(w: &mut W, opts: &OutputOptions) -> std::io::Result<()> {
    if opts.timestamp {
        let now = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        write!(w, "[{}.{:03}] ", now.as_secs(), now.subsec_millis())?;
    }
    Ok(())
}

impl Printable for Table {
    fn print_text<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write!(w, "table {} {}", self.family, self.name)?;
        if self.use_count > 0 {
            write!(w, " use {}", self.use_count)?;
        }
        if self.flags != 0 {
            write!(w, " flags {:#x}", self.flags)?;
        }
        writeln!(w)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "family": self.family.name(),
            "name": self.name,
            "use": self.use_count,
            "flags": self.flags,
        })
    }
}

impl Printable for Obj {
    fn print_text<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let table = self.table();
        match self {
            Obj::Quota(q) => {
                write!(
                    w,
                    "quota {} {} {} {}{} bytes",
                    table.family,
                    table.name,
                    q.name,
                    if q.over { "over " } else { "" },
                    q.bytes
                )?;
                if q.consumed > 0 {
                    write!(w, " used {} bytes", q.consumed)?;
                }
                writeln!(w)
            }
            Obj::Other { name, obj_type, .. } => writeln!(
                w,
                "object {} {} {} type {}",
                table.family, table.name, name, obj_type
            ),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftlink::netlink::nftables::{QuotaObj, TableFamily};

    fn text<P: Printable>(item: &P) -> String {
        let mut buf = Vec::new();
        item.print_text(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn table_text() {
        let table = Table::new("filter", TableFamily::Ipv6);
        assert_eq!(text(&table), "table ip6 filter\n");
    }

    #[test]
    fn quota_text() {
        let table = Table::new("filter", TableFamily::Inet);
        let quota: Obj = QuotaObj::new(table, "monthly", 1024).over(true).into();
        assert_eq!(text(&quota), "quota inet filter monthly over 1024 bytes\n");
    }

    #[test]
    fn list_json_is_array() {
        let tables = vec![
            Table::new("a", TableFamily::Inet),
            Table::new("b", TableFamily::Ipv4),
        ];
        let mut buf = Vec::new();
        print_all(&mut buf, &tables, OutputFormat::Json, &OutputOptions::default()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json[1]["family"], "ip");
        assert_eq!(json[0]["name"], "a");
    }
}
