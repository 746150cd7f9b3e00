//! 数据库事务
//!
//! [`Tx`] 与 [`Db`](crate::engine::Db) 实现同一个 [`Engine`] 能力，
//! CRUD 操作因此对两者一视同仁。sqlx 的事务执行需要独占连接，
//! 这里用异步互斥量把它装进共享引用的世界；`commit`/`rollback`
//! 消费掉事务本身。

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::engine::{self, Db, DbDriver, Engine, ExecResult, Rows, Stmt};
use crate::error::{Error, Result};
use crate::rewrite;
use crate::value::Value;

enum TxInner {
    #[cfg(feature = "mysql")]
    MySql(sqlx::Transaction<'static, sqlx::MySql>),
    #[cfg(feature = "postgres")]
    Postgres(sqlx::Transaction<'static, sqlx::Postgres>),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::Transaction<'static, sqlx::Sqlite>),
}

/// 进行中的事务
pub struct Tx {
    driver: DbDriver,
    prefix: String,
    inner: tokio::sync::Mutex<TxInner>,
}

impl Db {
    /// 开启一个事务
    pub async fn begin(&self) -> Result<Tx> {
        match self.driver() {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql_pool().ok_or(Error::NoPool)?;
                let tx = pool.begin().await?;
                Ok(Tx::new(self, TxInner::MySql(tx)))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg_pool().ok_or(Error::NoPool)?;
                let tx = pool.begin().await?;
                Ok(Tx::new(self, TxInner::Postgres(tx)))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite_pool().ok_or(Error::NoPool)?;
                let tx = pool.begin().await?;
                Ok(Tx::new(self, TxInner::Sqlite(tx)))
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::NoPool),
        }
    }
}

impl Tx {
    fn new(db: &Db, inner: TxInner) -> Self {
        Tx {
            driver: db.driver(),
            prefix: db.prefix().to_string(),
            inner: tokio::sync::Mutex::new(inner),
        }
    }

    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    /// 提交事务
    pub async fn commit(self) -> Result<()> {
        match self.inner.into_inner() {
            #[cfg(feature = "mysql")]
            TxInner::MySql(tx) => tx.commit().await.map_err(Error::from),
            #[cfg(feature = "postgres")]
            TxInner::Postgres(tx) => tx.commit().await.map_err(Error::from),
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(tx) => tx.commit().await.map_err(Error::from),
            #[allow(unreachable_patterns)]
            _ => Err(Error::NoPool),
        }
    }

    /// 回滚事务
    pub async fn rollback(self) -> Result<()> {
        match self.inner.into_inner() {
            #[cfg(feature = "mysql")]
            TxInner::MySql(tx) => tx.rollback().await.map_err(Error::from),
            #[cfg(feature = "postgres")]
            TxInner::Postgres(tx) => tx.rollback().await.map_err(Error::from),
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(tx) => tx.rollback().await.map_err(Error::from),
            #[allow(unreachable_patterns)]
            _ => Err(Error::NoPool),
        }
    }

    fn prepare_sql(&self, rewrite: bool, sql: &str) -> String {
        rewrite::apply(self.driver.dialect(), &self.prefix, rewrite, sql)
    }
}

#[async_trait]
impl Engine for Tx {
    fn dialect(&self) -> &'static dyn Dialect {
        self.driver.dialect()
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn exec(&self, rewrite: bool, sql: &str, args: Vec<Value>) -> Result<ExecResult> {
        let sql = self.prepare_sql(rewrite, sql);
        tracing::debug!(sql = %sql, "tx exec");

        let mut guard = self.inner.lock().await;
        match &mut *guard {
            #[cfg(feature = "mysql")]
            TxInner::MySql(tx) => {
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = engine::mysql_driver::bind(query, v);
                }
                let res = query.execute(&mut **tx).await?;
                Ok(ExecResult {
                    rows_affected: res.rows_affected(),
                    last_insert_id: Some(res.last_insert_id() as i64),
                })
            }
            #[cfg(feature = "postgres")]
            TxInner::Postgres(tx) => {
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = engine::pg_driver::bind(query, v);
                }
                let res = query.execute(&mut **tx).await?;
                Ok(ExecResult {
                    rows_affected: res.rows_affected(),
                    last_insert_id: None,
                })
            }
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(tx) => {
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = engine::sqlite_driver::bind(query, v);
                }
                let res = query.execute(&mut **tx).await?;
                Ok(ExecResult {
                    rows_affected: res.rows_affected(),
                    last_insert_id: Some(res.last_insert_rowid()),
                })
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::NoPool),
        }
    }

    async fn query(&self, rewrite: bool, sql: &str, args: Vec<Value>) -> Result<Rows> {
        let sql = self.prepare_sql(rewrite, sql);
        tracing::debug!(sql = %sql, "tx query");

        let mut guard = self.inner.lock().await;
        match &mut *guard {
            #[cfg(feature = "mysql")]
            TxInner::MySql(tx) => {
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = engine::mysql_driver::bind(query, v);
                }
                engine::mysql_driver::materialize(query.fetch_all(&mut **tx).await?)
            }
            #[cfg(feature = "postgres")]
            TxInner::Postgres(tx) => {
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = engine::pg_driver::bind(query, v);
                }
                engine::pg_driver::materialize(query.fetch_all(&mut **tx).await?)
            }
            #[cfg(feature = "sqlite")]
            TxInner::Sqlite(tx) => {
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = engine::sqlite_driver::bind(query, v);
                }
                engine::sqlite_driver::materialize(query.fetch_all(&mut **tx).await?)
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::NoPool),
        }
    }

    async fn prepare(&self, rewrite: bool, sql: &str) -> Result<Stmt> {
        Ok(engine::make_stmt(self.prepare_sql(rewrite, sql)))
    }
}
