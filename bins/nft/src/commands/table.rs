//! nft table - add, list, flush and delete tables.

use clap::{Args, Subcommand};
use nftlink::netlink::Connection;
use nftlink::netlink::nftables::{Table, TableFamily};

use crate::output::{OutputFormat, OutputOptions, print_all, print_one};

#[derive(Args)]
pub struct TableCmd {
    #[command(subcommand)]
    action: Option<TableAction>,
}

#[derive(Subcommand)]
enum TableAction {
    /// List tables.
    #[command(visible_alias = "ls", visible_alias = "show")]
    List {
        /// Only list tables of this family.
        #[arg(short = 'f', long)]
        family: Option<TableFamily>,
    },

    /// Show one table.
    Get {
        /// Table name.
        name: String,

        /// Table family.
        #[arg(short = 'f', long, default_value = "ip")]
        family: TableFamily,
    },

    /// Add a table (no error if it exists).
    Add {
        /// Table name.
        name: String,

        /// Table family.
        #[arg(short = 'f', long, default_value = "inet")]
        family: TableFamily,
    },

    /// Create a table (error if it exists).
    Create {
        /// Table name.
        name: String,

        /// Table family.
        #[arg(short = 'f', long, default_value = "inet")]
        family: TableFamily,
    },

    /// Delete a table and everything in it.
    #[command(visible_alias = "del")]
    Delete {
        /// Table name.
        name: String,

        /// Table family.
        #[arg(short = 'f', long, default_value = "inet")]
        family: TableFamily,
    },

    /// Remove every rule in a table.
    Flush {
        /// Table name.
        name: String,

        /// Table family.
        #[arg(short = 'f', long, default_value = "inet")]
        family: TableFamily,
    },
}

impl TableCmd {
    pub async fn run(
        &self,
        conn: &Connection,
        format: OutputFormat,
        opts: &OutputOptions,
    ) -> nftlink::Result<()> {
        match &self.action {
            Some(TableAction::List { family }) => {
                let tables = match family {
                    Some(family) => conn.list_tables_of_family(*family).await?,
                    None => conn.list_tables().await?,
                };
                let mut stdout = std::io::stdout().lock();
                print_all(&mut stdout, &tables, format, opts)?;
            }
            None => {
                let tables = conn.list_tables().await?;
                let mut stdout = std::io::stdout().lock();
                print_all(&mut stdout, &tables, format, opts)?;
            }
            Some(TableAction::Get { name, family }) => {
                let table = conn.list_table_of_family(name, *family).await?;
                let mut stdout = std::io::stdout().lock();
                print_one(&mut stdout, &table, format, opts)?;
            }
            Some(TableAction::Add { name, family }) => {
                conn.add_table(&Table::new(name, *family));
                conn.flush().await?;
            }
            Some(TableAction::Create { name, family }) => {
                conn.create_table(&Table::new(name, *family));
                conn.flush().await?;
            }
            Some(TableAction::Delete { name, family }) => {
                conn.del_table(&Table::new(name, *family));
                conn.flush().await?;
            }
            Some(TableAction::Flush { name, family }) => {
                conn.flush_table(&Table::new(name, *family));
                conn.flush().await?;
            }
        }

        Ok(())
    }
}
