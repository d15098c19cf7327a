//! nft quota - manage named byte quotas.

use clap::{Args, Subcommand};
use nftlink::netlink::Connection;
use nftlink::netlink::nftables::{Obj, QuotaObj, Table, TableFamily};

use crate::output::{OutputFormat, OutputOptions, print_all};

#[derive(Args)]
pub struct QuotaCmd {
    #[command(subcommand)]
    action: QuotaAction,
}

#[derive(Subcommand)]
enum QuotaAction {
    /// List the quotas of a table.
    #[command(visible_alias = "ls", visible_alias = "show")]
    List {
        /// Table name.
        table: String,

        /// Table family.
        #[arg(short = 'f', long, default_value = "inet")]
        family: TableFamily,
    },

    /// Add or update a quota.
    Add {
        /// Table name.
        table: String,

        /// Quota name.
        name: String,

        /// Limit in bytes.
        bytes: u64,

        /// Match once the quota is exceeded.
        #[arg(long)]
        over: bool,

        /// Table family.
        #[arg(short = 'f', long, default_value = "inet")]
        family: TableFamily,
    },

    /// Delete a quota.
    #[command(visible_alias = "del")]
    Delete {
        /// Table name.
        table: String,

        /// Quota name.
        name: String,

        /// Table family.
        #[arg(short = 'f', long, default_value = "inet")]
        family: TableFamily,
    },
}

impl QuotaCmd {
    pub async fn run(
        &self,
        conn: &Connection,
        format: OutputFormat,
        opts: &OutputOptions,
    ) -> nftlink::Result<()> {
        match &self.action {
            QuotaAction::List { table, family } => {
                let objs: Vec<Obj> = conn
                    .list_objs(&Table::new(table, *family))
                    .await?
                    .into_iter()
                    .filter(|obj| matches!(obj, Obj::Quota(_)))
                    .collect();
                let mut stdout = std::io::stdout().lock();
                print_all(&mut stdout, &objs, format, opts)?;
            }
            QuotaAction::Add {
                table,
                name,
                bytes,
                over,
                family,
            } => {
                let quota = QuotaObj::new(Table::new(table, *family), name, *bytes).over(*over);
                conn.add_obj(&quota.into());
                conn.flush().await?;
            }
            QuotaAction::Delete {
                table,
                name,
                family,
            } => {
                let quota = QuotaObj::new(Table::new(table, *family), name, 0);
                conn.del_obj(&quota.into());
                conn.flush().await?;
            }
        }

        Ok(())
    }
}
