//! Quota object integration tests.

use nftlink::Result;
use nftlink::netlink::nftables::{Obj, QuotaObj, Table, TableFamily};

use crate::common::TestNamespace;

#[tokio::test]
async fn test_quota_lifecycle() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("quota")?;
    let conn = ns.connection()?;
    let table = Table::new("filter", TableFamily::Inet);

    let quota: Obj = QuotaObj::new(table.clone(), "monthly", 10 << 30)
        .over(true)
        .into();

    conn.add_table(&table);
    conn.add_obj(&quota);
    conn.flush().await?;

    let objs = conn.list_objs(&table).await?;
    assert_eq!(objs.len(), 1);
    match &objs[0] {
        Obj::Quota(q) => {
            assert_eq!(q.name, "monthly");
            assert_eq!(q.bytes, 10 << 30);
            assert_eq!(q.consumed, 0);
            assert!(q.over);
            assert_eq!(q.table.family, TableFamily::Inet);
        }
        other => panic!("expected a quota, got {:?}", other),
    }

    conn.del_obj(&quota);
    conn.flush().await?;
    assert!(conn.list_objs(&table).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_quota_in_missing_table_fails() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("quotanotable")?;
    let conn = ns.connection()?;
    let table = Table::new("missing", TableFamily::Inet);

    conn.add_obj(&QuotaObj::new(table, "q", 1024).into());
    let err = conn.flush().await.unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}
