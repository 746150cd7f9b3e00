//! tagorm 的 SQLite 演示：建表、增删改查、批量插入与事务

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tagorm::{Db, EngineExt, Record};

#[derive(Record, Default, Debug, Clone)]
#[orm("name(users)")]
struct User {
    #[orm("name(id);ai")]
    id: i64,
    #[orm("unique(u_email);len(100)")]
    email: String,
    #[orm("len(20)")]
    nickname: String,
    age: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // 内存库限制单连接，保证所有语句看到同一份数据
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = Db::from_sqlite_pool(Arc::new(pool), "demo_");

    db.create(&User::default()).await?;
    println!("table created");

    let alice = User {
        email: "alice@example.com".into(),
        nickname: "alice".into(),
        age: 30,
        ..User::default()
    };
    let res = db.insert(&alice).await?;
    println!("inserted alice, id = {:?}", res.last_insert_id);

    let bob = User {
        email: "bob@example.com".into(),
        nickname: "bob".into(),
        age: 25,
        ..User::default()
    };
    let carol = User {
        email: "carol@example.com".into(),
        nickname: "carol".into(),
        age: 30,
        ..User::default()
    };
    db.insert_many(&[&bob, &carol]).await?;
    println!("batch inserted bob & carol");

    // 按唯一索引回查
    let mut found = User {
        email: "alice@example.com".into(),
        ..User::default()
    };
    db.find(&mut found).await?;
    println!("found: {found:?}");

    // 只更新非零字段
    let mut patch = User {
        id: found.id,
        nickname: "alice2".into(),
        ..User::default()
    };
    db.update(&patch, &[]).await?;
    db.find(&mut patch).await?;
    println!("after update: {patch:?}");

    let probe = User {
        age: 30,
        ..User::default()
    };
    println!("users aged 30: {}", db.count(&probe).await?);

    // 事务回滚
    let tx = db.begin().await?;
    tx.insert(&User {
        email: "temp@example.com".into(),
        nickname: "temp".into(),
        age: 1,
        ..User::default()
    })
    .await?;
    tx.rollback().await?;

    let mut gone = User {
        email: "temp@example.com".into(),
        ..User::default()
    };
    println!("rolled back row exists: {}", db.find(&mut gone).await?);

    db.delete(&found).await?;
    println!("alice deleted");

    Ok(())
}
