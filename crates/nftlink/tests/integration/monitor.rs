//! Monitor integration tests.

use std::time::Duration;

use nftlink::Result;
use nftlink::netlink::nftables::{
    Monitor, MonitorAction, MonitorEventData, MonitorEventType, MonitorObject, QuotaObj, Table,
    TableFamily,
};

use crate::common::TestNamespace;

#[tokio::test]
async fn test_monitor_new_tables() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("montable")?;
    let conn = ns.connection()?;

    let monitor = Monitor::builder()
        .action(MonitorAction::New)
        .object(MonitorObject::Tables)
        .event_buffer(8)
        .build();
    let mut events = conn.add_monitor(&monitor)?;

    let table = Table::new("watched", TableFamily::Inet);
    conn.add_table(&table);
    conn.flush().await?;
    conn.del_table(&table);
    conn.flush().await?;

    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no table event")
        .expect("monitor stopped");
    assert_eq!(event.event_type, MonitorEventType::NewTable);
    match event.data? {
        MonitorEventData::Table(t) => {
            assert_eq!(t.name, "watched");
            assert_eq!(t.family, TableFamily::Inet);
        }
        other => panic!("unexpected data {:?}", other),
    }

    // The deletion is filtered out.
    let next = tokio::time::timeout(Duration::from_millis(200), events.recv()).await;
    assert!(next.is_err());

    monitor.close()?;
    let end = tokio::time::timeout(Duration::from_secs(2), events.recv()).await;
    assert!(matches!(end, Ok(None)));

    Ok(())
}

#[tokio::test]
async fn test_monitor_ruleset_objects() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("monobj")?;
    let conn = ns.connection()?;

    let monitor = Monitor::builder()
        .object(MonitorObject::Ruleset)
        .event_buffer(8)
        .build();
    let mut events = conn.add_monitor(&monitor)?;

    let table = Table::new("filter", TableFamily::Ipv4);
    conn.add_table(&table);
    conn.add_obj(&QuotaObj::new(table.clone(), "q", 4096).into());
    conn.flush().await?;

    let mut saw_quota = false;
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(2), events.recv()).await
    {
        if event.event_type == MonitorEventType::NewObj {
            assert!(matches!(event.data, Ok(MonitorEventData::Obj(_))));
            saw_quota = true;
            break;
        }
    }
    assert!(saw_quota);

    monitor.close()?;
    monitor.close()?;
    assert!(conn.add_monitor(&monitor).is_err());

    Ok(())
}
