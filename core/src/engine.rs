//! 执行引擎
//!
//! [`Engine`] 是 CRUD 层消费的最小能力集：方言、表名前缀与三种执行
//! 入口。[`Db`] 是连接池实现，驱动由 URL 决定，每种驱动一个可选的
//! sqlx 连接池；事务实现见 [`crate::transaction::Tx`]。
//!
//! 结果集在引擎内物化为 [`Rows`]：按列的 SQL 类型名逐格解码成
//! [`Value`]，未知类型依次回退到字符串、字节串与带类型的 NULL。

use std::sync::Arc;

use async_trait::async_trait;

use crate::dialect::{Dialect, Mysql, Postgres, Sqlite3};
use crate::error::{Error, Result};
use crate::rewrite;
use crate::value::Value;

/// 一次写操作的结果
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// MySQL/SQLite 返回自增主键；PostgreSQL 没有对应机制，恒为 `None`
    pub last_insert_id: Option<i64>,
}

/// 物化后的结果集，单一所有者
#[derive(Debug, Default)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 预编译语句句柄
///
/// 只保存改写完成的 SQL 文本；sqlx 在连接层缓存真正的预编译语句，
/// 因此句柄可以在同方言的任意引擎上反复执行。
#[derive(Debug, Clone)]
pub struct Stmt {
    sql: String,
}

impl Stmt {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub async fn exec<E>(&self, e: &E, args: Vec<Value>) -> Result<ExecResult>
    where
        E: Engine + ?Sized,
    {
        e.exec(false, &self.sql, args).await
    }

    pub async fn query<E>(&self, e: &E, args: Vec<Value>) -> Result<Rows>
    where
        E: Engine + ?Sized,
    {
        e.query(false, &self.sql, args).await
    }
}

/// CRUD 层消费的引擎能力
///
/// `rewrite` 为真时展开 `{name}`/`{#name}` 标记；`?` 到方言原生
/// 占位符的翻译总是进行。所有阻塞都发生在驱动调用上。
#[async_trait]
pub trait Engine: Send + Sync {
    fn dialect(&self) -> &'static dyn Dialect;

    /// 全局表名前缀，拼接在每个表标识符之前
    fn prefix(&self) -> &str;

    async fn exec(&self, rewrite: bool, sql: &str, args: Vec<Value>) -> Result<ExecResult>;

    async fn query(&self, rewrite: bool, sql: &str, args: Vec<Value>) -> Result<Rows>;

    async fn prepare(&self, rewrite: bool, sql: &str) -> Result<Stmt>;
}

/// 数据库驱动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    MySql,
    Postgres,
    Sqlite,
}

impl DbDriver {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(DbDriver::MySql)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbDriver::Postgres)
        } else if url.starts_with("sqlite://") || url.starts_with("sqlite:") {
            Ok(DbDriver::Sqlite)
        } else {
            Err(Error::UnsupportedDatabase(url.to_string()))
        }
    }

    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            DbDriver::MySql => &Mysql,
            DbDriver::Postgres => &Postgres,
            DbDriver::Sqlite => &Sqlite3,
        }
    }
}

/// 连接池引擎
#[derive(Debug, Clone)]
pub struct Db {
    driver: DbDriver,
    prefix: String,
    #[cfg(feature = "mysql")]
    mysql: Option<Arc<sqlx::Pool<sqlx::MySql>>>,
    #[cfg(feature = "postgres")]
    pg: Option<Arc<sqlx::Pool<sqlx::Postgres>>>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<Arc<sqlx::Pool<sqlx::Sqlite>>>,
}

impl Db {
    fn empty(driver: DbDriver, prefix: &str) -> Self {
        Db {
            driver,
            prefix: prefix.to_string(),
            #[cfg(feature = "mysql")]
            mysql: None,
            #[cfg(feature = "postgres")]
            pg: None,
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 按 URL 建立连接池，`prefix` 为全局表名前缀（可为空串）
    pub async fn connect(url: &str, prefix: &str) -> Result<Self> {
        let driver = DbDriver::from_url(url)?;

        match driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = sqlx::Pool::<sqlx::MySql>::connect(url).await?;
                Ok(Self::from_mysql_pool(Arc::new(pool), prefix))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = sqlx::Pool::<sqlx::Postgres>::connect(url).await?;
                Ok(Self::from_postgres_pool(Arc::new(pool), prefix))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = sqlx::Pool::<sqlx::Sqlite>::connect(url).await?;
                Ok(Self::from_sqlite_pool(Arc::new(pool), prefix))
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::UnsupportedDatabase(url.to_string())),
        }
    }

    #[cfg(feature = "mysql")]
    pub fn from_mysql_pool(pool: Arc<sqlx::Pool<sqlx::MySql>>, prefix: &str) -> Self {
        let mut db = Self::empty(DbDriver::MySql, prefix);
        db.mysql = Some(pool);
        db
    }

    #[cfg(feature = "postgres")]
    pub fn from_postgres_pool(pool: Arc<sqlx::Pool<sqlx::Postgres>>, prefix: &str) -> Self {
        let mut db = Self::empty(DbDriver::Postgres, prefix);
        db.pg = Some(pool);
        db
    }

    #[cfg(feature = "sqlite")]
    pub fn from_sqlite_pool(pool: Arc<sqlx::Pool<sqlx::Sqlite>>, prefix: &str) -> Self {
        let mut db = Self::empty(DbDriver::Sqlite, prefix);
        db.sqlite = Some(pool);
        db
    }

    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    /// 连接串中的逻辑数据库名
    pub fn name_of(&self, dsn: &str) -> String {
        self.dialect().db_name(dsn)
    }

    #[cfg(feature = "mysql")]
    pub fn mysql_pool(&self) -> Option<&sqlx::Pool<sqlx::MySql>> {
        self.mysql.as_deref()
    }

    #[cfg(feature = "postgres")]
    pub fn pg_pool(&self) -> Option<&sqlx::Pool<sqlx::Postgres>> {
        self.pg.as_deref()
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite_pool(&self) -> Option<&sqlx::Pool<sqlx::Sqlite>> {
        self.sqlite.as_deref()
    }

    fn prepare_sql(&self, rewrite: bool, sql: &str) -> String {
        rewrite::apply(self.dialect(), &self.prefix, rewrite, sql)
    }
}

#[async_trait]
impl Engine for Db {
    fn dialect(&self) -> &'static dyn Dialect {
        self.driver.dialect()
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn exec(&self, rewrite: bool, sql: &str, args: Vec<Value>) -> Result<ExecResult> {
        let sql = self.prepare_sql(rewrite, sql);
        tracing::debug!(sql = %sql, "exec");

        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or(Error::NoPool)?;
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = mysql_driver::bind(query, v);
                }
                let res = query.execute(pool).await?;
                Ok(ExecResult {
                    rows_affected: res.rows_affected(),
                    last_insert_id: Some(res.last_insert_id() as i64),
                })
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or(Error::NoPool)?;
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = pg_driver::bind(query, v);
                }
                let res = query.execute(pool).await?;
                Ok(ExecResult {
                    rows_affected: res.rows_affected(),
                    last_insert_id: None,
                })
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or(Error::NoPool)?;
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = sqlite_driver::bind(query, v);
                }
                let res = query.execute(pool).await?;
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
        tracing::debug!(sql = %sql, "query");

        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or(Error::NoPool)?;
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = mysql_driver::bind(query, v);
                }
                mysql_driver::materialize(query.fetch_all(pool).await?)
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or(Error::NoPool)?;
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = pg_driver::bind(query, v);
                }
                pg_driver::materialize(query.fetch_all(pool).await?)
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or(Error::NoPool)?;
                let mut query = sqlx::query(&sql);
                for v in args {
                    query = sqlite_driver::bind(query, v);
                }
                sqlite_driver::materialize(query.fetch_all(pool).await?)
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::NoPool),
        }
    }

    async fn prepare(&self, rewrite: bool, sql: &str) -> Result<Stmt> {
        Ok(Stmt {
            sql: self.prepare_sql(rewrite, sql),
        })
    }
}

pub(crate) fn make_stmt(sql: String) -> Stmt {
    Stmt { sql }
}

// ========== MySQL 驱动桥 ==========

#[cfg(feature = "mysql")]
pub(crate) mod mysql_driver {
    use super::{Result, Rows, Value};
    use sqlx::mysql::{MySqlArguments, MySqlRow};
    use sqlx::{Column as _, Row as _, TypeInfo as _};

    type Query<'q> = sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>;

    pub(crate) fn bind(query: Query<'_>, v: Value) -> Query<'_> {
        match v {
            Value::Bool(x) => query.bind(x),
            Value::Int(x) => query.bind(x),
            Value::UInt(x) => query.bind(x),
            Value::Float(x) => query.bind(x),
            Value::Str(x) => query.bind(x),
            Value::Bytes(x) => query.bind(x),
            Value::DateTime(x) => query.bind(x),
        }
    }

    pub(crate) fn materialize(rows: Vec<MySqlRow>) -> Result<Rows> {
        let mut out = Rows::default();
        for (n, row) in rows.iter().enumerate() {
            if n == 0 {
                out.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
            }
            out.rows.push(decode_row(row)?);
        }
        Ok(out)
    }

    fn decode_row(row: &MySqlRow) -> Result<Vec<Value>> {
        let mut cells = Vec::with_capacity(row.len());
        for (i, col) in row.columns().iter().enumerate() {
            let cell = match col.type_info().name() {
                "BOOLEAN" => Value::Bool(row.try_get(i)?),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                    Value::Int(row.try_get(i)?)
                }
                "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED"
                | "INT UNSIGNED" | "BIGINT UNSIGNED" => Value::UInt(row.try_get(i)?),
                "FLOAT" => Value::Float(row.try_get::<Option<f32>, _>(i)?.map(f64::from)),
                "DOUBLE" => Value::Float(row.try_get(i)?),
                "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" => {
                    Value::Str(row.try_get(i)?)
                }
                "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                    Value::Bytes(row.try_get(i)?)
                }
                "DATETIME" | "TIMESTAMP" => Value::DateTime(row.try_get(i)?),
                _ => super::decode_fallback(|| row.try_get(i), || row.try_get(i)),
            };
            cells.push(cell);
        }
        Ok(cells)
    }
}

// ========== PostgreSQL 驱动桥 ==========

#[cfg(feature = "postgres")]
pub(crate) mod pg_driver {
    use super::{Result, Rows, Value};
    use sqlx::postgres::{PgArguments, PgRow};
    use sqlx::{Column as _, Row as _, TypeInfo as _};

    type Query<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

    pub(crate) fn bind(query: Query<'_>, v: Value) -> Query<'_> {
        match v {
            Value::Bool(x) => query.bind(x),
            Value::Int(x) => query.bind(x),
            // PostgreSQL 没有无符号整数参数类型
            Value::UInt(x) => query.bind(x.map(|v| v as i64)),
            Value::Float(x) => query.bind(x),
            Value::Str(x) => query.bind(x),
            Value::Bytes(x) => query.bind(x),
            Value::DateTime(x) => query.bind(x),
        }
    }

    pub(crate) fn materialize(rows: Vec<PgRow>) -> Result<Rows> {
        let mut out = Rows::default();
        for (n, row) in rows.iter().enumerate() {
            if n == 0 {
                out.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
            }
            out.rows.push(decode_row(row)?);
        }
        Ok(out)
    }

    fn decode_row(row: &PgRow) -> Result<Vec<Value>> {
        let mut cells = Vec::with_capacity(row.len());
        for (i, col) in row.columns().iter().enumerate() {
            let cell = match col.type_info().name() {
                "BOOL" => Value::Bool(row.try_get(i)?),
                "INT2" => Value::Int(row.try_get::<Option<i16>, _>(i)?.map(i64::from)),
                "INT4" => Value::Int(row.try_get::<Option<i32>, _>(i)?.map(i64::from)),
                "INT8" => Value::Int(row.try_get(i)?),
                "FLOAT4" => Value::Float(row.try_get::<Option<f32>, _>(i)?.map(f64::from)),
                "FLOAT8" => Value::Float(row.try_get(i)?),
                "VARCHAR" | "TEXT" | "BPCHAR" | "NAME" => Value::Str(row.try_get(i)?),
                "BYTEA" => Value::Bytes(row.try_get(i)?),
                "TIMESTAMP" => Value::DateTime(row.try_get(i)?),
                "TIMESTAMPTZ" => Value::DateTime(
                    row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)?
                        .map(|dt| dt.naive_utc()),
                ),
                _ => super::decode_fallback(|| row.try_get(i), || row.try_get(i)),
            };
            cells.push(cell);
        }
        Ok(cells)
    }
}

// ========== SQLite 驱动桥 ==========

#[cfg(feature = "sqlite")]
pub(crate) mod sqlite_driver {
    use super::{Result, Rows, Value};
    use sqlx::sqlite::{SqliteArguments, SqliteRow};
    use sqlx::{Column as _, Row as _, TypeInfo as _};

    type Query<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

    pub(crate) fn bind(query: Query<'_>, v: Value) -> Query<'_> {
        match v {
            Value::Bool(x) => query.bind(x),
            Value::Int(x) => query.bind(x),
            // SQLite 的整数一律是 i64
            Value::UInt(x) => query.bind(x.map(|v| v as i64)),
            Value::Float(x) => query.bind(x),
            Value::Str(x) => query.bind(x),
            Value::Bytes(x) => query.bind(x),
            Value::DateTime(x) => query.bind(x),
        }
    }

    pub(crate) fn materialize(rows: Vec<SqliteRow>) -> Result<Rows> {
        let mut out = Rows::default();
        for (n, row) in rows.iter().enumerate() {
            if n == 0 {
                out.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
            }
            out.rows.push(decode_row(row)?);
        }
        Ok(out)
    }

    fn decode_row(row: &SqliteRow) -> Result<Vec<Value>> {
        let mut cells = Vec::with_capacity(row.len());
        for (i, col) in row.columns().iter().enumerate() {
            let cell = match col.type_info().name() {
                "BOOLEAN" => Value::Bool(row.try_get(i)?),
                "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => Value::Int(row.try_get(i)?),
                "REAL" | "NUMERIC" => Value::Float(row.try_get(i)?),
                "TEXT" => Value::Str(row.try_get(i)?),
                "BLOB" => Value::Bytes(row.try_get(i)?),
                "DATETIME" => Value::DateTime(row.try_get(i)?),
                _ => super::decode_fallback(|| row.try_get(i), || row.try_get(i)),
            };
            cells.push(cell);
        }
        Ok(cells)
    }
}

/// 未知列类型的回退解码：字符串、字节串，最后是带类型的 NULL
#[allow(dead_code)]
fn decode_fallback(
    as_str: impl FnOnce() -> std::result::Result<Option<String>, sqlx::Error>,
    as_bytes: impl FnOnce() -> std::result::Result<Option<Vec<u8>>, sqlx::Error>,
) -> Value {
    if let Ok(v) = as_str() {
        return Value::Str(v);
    }
    if let Ok(v) = as_bytes() {
        return Value::Bytes(v);
    }
    Value::Str(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_from_url() {
        assert_eq!(DbDriver::from_url("mysql://localhost/db").unwrap(), DbDriver::MySql);
        assert_eq!(
            DbDriver::from_url("postgresql://localhost/db").unwrap(),
            DbDriver::Postgres
        );
        assert_eq!(DbDriver::from_url("sqlite::memory:").unwrap(), DbDriver::Sqlite);
        assert!(DbDriver::from_url("oracle://x").is_err());
    }

    #[test]
    fn test_driver_dialect() {
        assert_eq!(DbDriver::MySql.dialect().name(), "mysql");
        assert_eq!(DbDriver::Postgres.dialect().name(), "postgres");
        assert_eq!(DbDriver::Sqlite.dialect().name(), "sqlite3");
        assert!(DbDriver::Postgres.dialect().numbered_placeholders());
    }
}
