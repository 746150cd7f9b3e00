//! CRUD 引擎
//!
//! 每个操作都遵循同一个模式：取模型（必要时编译）、从记录值与方言
//! 合成 SQL 与参数向量、交给引擎执行。WHERE 合成有两种策略：
//!
//! - keyed：先尝试主键，要求全部列非零；不满足则按声明顺序尝试
//!   唯一索引，仍不满足返回 [`Error::NoWhereKey`]。
//! - any-field：所有非零列参与，COUNT 使用。
//!
//! 零值过滤沿用列上缓存的零值；INSERT 对自增列与带默认值的列过滤
//! 零值（无论是否手工赋的零），UPDATE 通过 `cols` 白名单强制包含
//! 指定列。

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::engine::{Engine, ExecResult};
use crate::error::{Error, Result};
use crate::fetch::{self, FetchInto};
use crate::model::{model_of, Column, Model};
use crate::record::{Record, RecordType};
use crate::transaction::Tx;
use crate::value::Value;

fn quoted_table(e: &(impl Engine + ?Sized), m: &Model) -> String {
    e.dialect().quoted(&format!("{}{}", e.prefix(), m.name))
}

fn record_value(rec: &dyn Record, col: &Column) -> Result<Value> {
    rec.get(&col.field)
        .ok_or_else(|| Error::schema(&col.field, "field value not found on record"))
}

/// 收集一组列的键值，任何一列缺失或为零值都返回 `None`
fn collect_key(m: &Model, rec: &dyn Record, cols: &[usize]) -> Option<Vec<(usize, Value)>> {
    if cols.is_empty() {
        return None;
    }

    let mut out = Vec::with_capacity(cols.len());
    for &i in cols {
        let col = &m.cols[i];
        let v = rec.get(&col.field)?;
        if col.is_zero(&v) {
            return None;
        }
        out.push((i, v));
    }
    Some(out)
}

fn render_where(d: &dyn Dialect, m: &Model, kv: Vec<(usize, Value)>) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE ");
    let mut args = Vec::with_capacity(kv.len());
    for (n, (i, v)) in kv.into_iter().enumerate() {
        if n > 0 {
            sql.push_str(" AND ");
        }
        d.quote(&mut sql, &m.cols[i].name);
        sql.push_str("=?");
        args.push(v);
    }
    (sql, args)
}

/// keyed 策略：主键优先，其次按声明顺序尝试唯一索引
fn where_by_key(d: &dyn Dialect, m: &Model, rec: &dyn Record) -> Result<(String, Vec<Value>)> {
    if let Some(kv) = collect_key(m, rec, &m.pk) {
        return Ok(render_where(d, m, kv));
    }

    for (_, cols) in &m.unique_indexes {
        if let Some(kv) = collect_key(m, rec, cols) {
            return Ok(render_where(d, m, kv));
        }
    }

    Err(Error::NoWhereKey)
}

/// any-field 策略：所有非零列
fn where_any(d: &dyn Dialect, m: &Model, rec: &dyn Record) -> Result<(String, Vec<Value>)> {
    let mut kv = Vec::new();
    for (i, col) in m.cols.iter().enumerate() {
        let v = record_value(rec, col)?;
        if !col.is_zero(&v) {
            kv.push((i, v));
        }
    }

    if kv.is_empty() {
        return Err(Error::NoWhereKey);
    }
    Ok(render_where(d, m, kv))
}

/// 建表。语句逐条执行，任何一条失败即停止并返回错误；
/// 已成功的 DDL 不做回滚，需要原子性时由调用方包在事务里。
pub async fn create<E>(e: &E, rec: &dyn Record) -> Result<()>
where
    E: Engine + ?Sized,
{
    let m = model_of(rec)?;
    let stmts = e.dialect().create_table_sql(&m, e.prefix())?;
    for sql in stmts {
        tracing::debug!(sql = %sql, "create");
        // rewrite 展开 check 表达式等处残留的 {name} 标记
        e.exec(true, &sql, Vec::new()).await?;
    }
    Ok(())
}

/// 插入一条记录
///
/// 零值列在属于自增列或带默认值时被过滤；显式赋零的普通列照常写入。
pub async fn insert<E>(e: &E, rec: &dyn Record) -> Result<ExecResult>
where
    E: Engine + ?Sized,
{
    let m = model_of(rec)?;
    let d = e.dialect();

    let mut names = String::new();
    let mut marks = String::new();
    let mut args = Vec::new();

    for col in &m.cols {
        let v = record_value(rec, col)?;
        if col.is_zero(&v) && (col.ai || col.has_default()) {
            continue;
        }
        if !args.is_empty() {
            names.push(',');
            marks.push(',');
        }
        d.quote(&mut names, &col.name);
        marks.push('?');
        args.push(v);
    }

    if args.is_empty() {
        return Err(Error::NoColumns);
    }

    let sql = format!(
        "INSERT INTO {}({names}) VALUES({marks})",
        quoted_table(e, &m)
    );
    tracing::debug!(sql = %sql, "insert");
    e.exec(false, &sql, args).await
}

/// 批量插入，生成单条多元组 INSERT
///
/// 第一条记录锁定列集；之后的记录若与第一条类型不同返回
/// [`Error::HeterogeneousBatch`]。被保留列上的零值（自增/默认值列）
/// 用方言的 DEFAULT/NULL 关键字占位，保证元组位置对齐。
pub async fn insert_many<E>(e: &E, recs: &[&dyn Record]) -> Result<ExecResult>
where
    E: Engine + ?Sized,
{
    let Some(&first) = recs.first() else {
        return Ok(ExecResult::default());
    };

    let m = model_of(first)?;
    let d = e.dialect();
    let tid = first.type_id();

    let mut keys = Vec::new();
    let mut names = String::new();
    let mut marks = String::new();
    let mut args = Vec::new();

    for (i, col) in m.cols.iter().enumerate() {
        let v = record_value(first, col)?;
        if col.is_zero(&v) && (col.ai || col.has_default()) {
            continue;
        }
        if !keys.is_empty() {
            names.push(',');
            marks.push(',');
        }
        d.quote(&mut names, &col.name);
        marks.push('?');
        args.push(v);
        keys.push(i);
    }

    if keys.is_empty() {
        return Err(Error::NoColumns);
    }

    let mut tuples = vec![format!("({marks})")];

    for rec in &recs[1..] {
        let rec: &dyn Record = *rec;
        if rec.type_id() != tid {
            return Err(Error::HeterogeneousBatch);
        }

        let mut marks = String::new();
        for (n, &i) in keys.iter().enumerate() {
            let col = &m.cols[i];
            let v = record_value(rec, col)?;
            if n > 0 {
                marks.push(',');
            }
            if col.is_zero(&v) && (col.ai || col.has_default()) {
                marks.push_str(d.default_values_keyword());
            } else {
                marks.push('?');
                args.push(v);
            }
        }
        tuples.push(format!("({marks})"));
    }

    let sql = format!(
        "INSERT INTO {}({names}) VALUES{}",
        quoted_table(e, &m),
        tuples.join(",")
    );
    tracing::debug!(sql = %sql, rows = recs.len(), "insert_many");
    e.exec(false, &sql, args).await
}

/// 按主键或唯一索引查找一行，结果写回 `rec` 本身
pub async fn find<E, T>(e: &E, rec: &mut T) -> Result<bool>
where
    E: Engine + ?Sized,
    T: Record + RecordType,
{
    let m = model_of(&*rec)?;
    let d = e.dialect();
    let (where_sql, args) = where_by_key(d, &m, &*rec)?;

    let sql = format!("SELECT * FROM {}{where_sql}", quoted_table(e, &m));
    tracing::debug!(sql = %sql, "find");
    let rows = e.query(false, &sql, args).await?;
    Ok(fetch::object(rows, rec)? > 0)
}

/// 同一条键控 SELECT，但结果交给任意接收器（批量变体）
pub async fn find_into<E, T, R>(e: &E, key: &T, receiver: &mut R) -> Result<usize>
where
    E: Engine + ?Sized,
    T: Record + RecordType,
    R: FetchInto<T> + Send + ?Sized,
{
    let m = model_of(key)?;
    let d = e.dialect();
    let (where_sql, args) = where_by_key(d, &m, key)?;

    let sql = format!("SELECT * FROM {}{where_sql}", quoted_table(e, &m));
    tracing::debug!(sql = %sql, "find_into");
    let rows = e.query(false, &sql, args).await?;
    fetch::object(rows, receiver)
}

/// 查找并加行锁，只能在事务中使用（由签名保证）
pub async fn for_update<T>(tx: &Tx, rec: &mut T) -> Result<bool>
where
    T: Record + RecordType,
{
    let m = model_of(&*rec)?;
    let d = Engine::dialect(tx);
    let (where_sql, args) = where_by_key(d, &m, &*rec)?;

    let sql = format!(
        "SELECT * FROM {}{where_sql} FOR UPDATE",
        quoted_table(tx, &m)
    );
    tracing::debug!(sql = %sql, "for_update");
    let rows = tx.query(false, &sql, args).await?;
    Ok(fetch::object(rows, rec)? > 0)
}

/// 更新一条记录，默认跳过零值列
///
/// `cols` 里列出的列即使是零值也强制更新。模型带乐观锁列时，
/// 该列始终自增一，且当前值参与 WHERE 条件（零也是合法版本号）。
pub async fn update<E>(e: &E, rec: &dyn Record, cols: &[&str]) -> Result<ExecResult>
where
    E: Engine + ?Sized,
{
    let m = model_of(rec)?;
    let d = e.dialect();

    let mut set = String::new();
    let mut args = Vec::new();

    for (i, col) in m.cols.iter().enumerate() {
        if Some(i) == m.occ {
            continue;
        }
        let v = record_value(rec, col)?;
        if col.is_zero(&v) && !cols.contains(&col.name.as_str()) {
            continue;
        }
        if !args.is_empty() {
            set.push(',');
        }
        d.quote(&mut set, &col.name);
        set.push_str("=?");
        args.push(v);
    }

    if args.is_empty() {
        return Err(Error::NoColumns);
    }

    if let Some(occ) = m.occ_col() {
        set.push(',');
        d.quote(&mut set, &occ.name);
        set.push('=');
        d.quote(&mut set, &occ.name);
        set.push_str("+1");
    }

    let (mut where_sql, where_args) = where_by_key(d, &m, rec)?;
    args.extend(where_args);

    if let Some(occ) = m.occ_col() {
        where_sql.push_str(" AND ");
        d.quote(&mut where_sql, &occ.name);
        where_sql.push_str("=?");
        args.push(record_value(rec, occ)?);
    }

    let sql = format!("UPDATE {} SET {set}{where_sql}", quoted_table(e, &m));
    tracing::debug!(sql = %sql, "update");
    e.exec(false, &sql, args).await
}

/// 按主键或唯一索引删除
pub async fn delete<E>(e: &E, rec: &dyn Record) -> Result<ExecResult>
where
    E: Engine + ?Sized,
{
    let m = model_of(rec)?;
    let (where_sql, args) = where_by_key(e.dialect(), &m, rec)?;

    let sql = format!("DELETE FROM {}{where_sql}", quoted_table(e, &m));
    tracing::debug!(sql = %sql, "delete");
    e.exec(false, &sql, args).await
}

/// 统计与记录非零字段匹配的行数
pub async fn count<E>(e: &E, rec: &dyn Record) -> Result<i64>
where
    E: Engine + ?Sized,
{
    let m = model_of(rec)?;
    let (where_sql, args) = where_any(e.dialect(), &m, rec)?;

    let sql = format!(
        "SELECT COUNT(*) AS count FROM {}{where_sql}",
        quoted_table(e, &m)
    );
    tracing::debug!(sql = %sql, "count");
    let rows = e.query(false, &sql, args).await?;

    // 计算列的类型信息因驱动而异，这里宽松解码
    let cell = rows
        .rows
        .into_iter()
        .next()
        .and_then(|r| r.into_iter().next())
        .unwrap_or(Value::Int(Some(0)));
    match cell {
        Value::Int(Some(v)) => Ok(v),
        Value::UInt(Some(v)) => Ok(v as i64),
        Value::Float(Some(v)) => Ok(v as i64),
        Value::Str(Some(s)) => s.trim().parse().map_err(|_| Error::InvalidKind {
            field: "count".to_string(),
            expected: "integer",
        }),
        _ => Ok(0),
    }
}

/// 清空表并重置自增计数
pub async fn truncate<E>(e: &E, rec: &dyn Record) -> Result<()>
where
    E: Engine + ?Sized,
{
    let m = model_of(rec)?;
    let ai = m.ai_col().map(|c| c.name.as_str()).unwrap_or("");
    truncate_named(e, &m.name, ai).await
}

/// 以表名清空，`ai_col` 为空表示无自增列需要重置
pub async fn truncate_named<E>(e: &E, table: &str, ai_col: &str) -> Result<()>
where
    E: Engine + ?Sized,
{
    let full = format!("{}{table}", e.prefix());
    for sql in e.dialect().truncate_table_sql(&full, ai_col) {
        tracing::debug!(sql = %sql, "truncate");
        e.exec(false, &sql, Vec::new()).await?;
    }
    Ok(())
}

/// 删表
pub async fn drop_table<E>(e: &E, rec: &dyn Record) -> Result<()>
where
    E: Engine + ?Sized,
{
    let m = model_of(rec)?;
    drop_table_named(e, &m.name).await
}

pub async fn drop_table_named<E>(e: &E, table: &str) -> Result<()>
where
    E: Engine + ?Sized,
{
    let full = e.dialect().quoted(&format!("{}{table}", e.prefix()));
    let sql = format!("DROP TABLE IF EXISTS {full}");
    tracing::debug!(sql = %sql, "drop");
    e.exec(false, &sql, Vec::new()).await?;
    Ok(())
}

/// 给所有引擎挂上 CRUD 便捷方法
///
/// [`Db`](crate::engine::Db) 与 [`Tx`] 都通过这层空白实现获得
/// `db.insert(&user)` 式的调用方式。
#[async_trait]
pub trait EngineExt: Engine {
    async fn create(&self, rec: &dyn Record) -> Result<()> {
        create(self, rec).await
    }

    async fn insert(&self, rec: &dyn Record) -> Result<ExecResult> {
        insert(self, rec).await
    }

    async fn insert_many(&self, recs: &[&dyn Record]) -> Result<ExecResult> {
        insert_many(self, recs).await
    }

    async fn find<T>(&self, rec: &mut T) -> Result<bool>
    where
        T: Record + RecordType,
    {
        find(self, rec).await
    }

    async fn find_into<T, R>(&self, key: &T, receiver: &mut R) -> Result<usize>
    where
        T: Record + RecordType,
        R: FetchInto<T> + Send + ?Sized,
    {
        find_into(self, key, receiver).await
    }

    async fn update(&self, rec: &dyn Record, cols: &[&str]) -> Result<ExecResult> {
        update(self, rec, cols).await
    }

    async fn delete(&self, rec: &dyn Record) -> Result<ExecResult> {
        delete(self, rec).await
    }

    async fn count(&self, rec: &dyn Record) -> Result<i64> {
        count(self, rec).await
    }

    async fn truncate(&self, rec: &dyn Record) -> Result<()> {
        truncate(self, rec).await
    }

    async fn truncate_named(&self, table: &str, ai_col: &str) -> Result<()> {
        truncate_named(self, table, ai_col).await
    }

    async fn drop_table(&self, rec: &dyn Record) -> Result<()> {
        drop_table(self, rec).await
    }

    async fn drop_table_named(&self, table: &str) -> Result<()> {
        drop_table_named(self, table).await
    }
}

impl<E: Engine + ?Sized> EngineExt for E {}

impl Tx {
    /// `SELECT … FOR UPDATE`，只在事务上提供
    pub async fn for_update<T>(&self, rec: &mut T) -> Result<bool>
    where
        T: Record + RecordType,
    {
        for_update(self, rec).await
    }
}
