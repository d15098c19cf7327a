//! Table integration tests.

use nftlink::Result;
use nftlink::netlink::nftables::{Table, TableFamily};

use crate::common::TestNamespace;

#[tokio::test]
async fn test_add_and_list_table() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("table")?;
    let conn = ns.connection()?;

    conn.add_table(&Table::new("filter", TableFamily::Ipv4));
    conn.add_table(&Table::new("filter6", TableFamily::Ipv6));
    conn.flush().await?;

    let tables = conn.list_tables().await?;
    assert_eq!(tables.len(), 2);
    assert!(
        tables
            .iter()
            .any(|t| t.name == "filter6" && t.family == TableFamily::Ipv6)
    );

    let ipv4 = conn.list_tables_of_family(TableFamily::Ipv4).await?;
    assert_eq!(ipv4.len(), 1);
    assert_eq!(ipv4[0].name, "filter");

    let table = conn.list_table("filter").await?;
    assert_eq!(table.family, TableFamily::Ipv4);
    assert_eq!(table.use_count, 0);

    Ok(())
}

#[tokio::test]
async fn test_list_missing_table() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("notable")?;
    let conn = ns.connection()?;

    let err = conn
        .list_table_of_family("missing", TableFamily::Inet)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        nftlink::Error::UnexpectedCount { actual: 0, .. }
    ));

    Ok(())
}

#[tokio::test]
async fn test_create_existing_table_fails() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("excl")?;
    let conn = ns.connection()?;
    let table = Table::new("filter", TableFamily::Inet);

    conn.add_table(&table);
    conn.flush().await?;

    // Adding again is fine, creating is not.
    conn.add_table(&table);
    conn.flush().await?;

    conn.create_table(&table);
    let err = conn.flush().await.unwrap_err();
    assert!(err.is_already_exists());

    Ok(())
}

#[tokio::test]
async fn test_flush_and_delete_table() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("deltable")?;
    let conn = ns.connection()?;
    let table = Table::new("nat", TableFamily::Inet);

    conn.add_table(&table);
    conn.flush().await?;

    conn.flush_table(&table);
    conn.del_table(&table);
    conn.flush().await?;

    assert!(conn.list_tables().await?.is_empty());

    Ok(())
}
