//! 结果集到记录的映射
//!
//! 接收器的形状决定行为：单条记录只取第一行；`Vec` 随结果增长；
//! 切片与定长数组按自身长度截断，多余的行丢弃。列名与标签导出的
//! 字段名大小写敏感匹配，结果集中无法识别的列直接丢弃。
//!
//! 映射前先把记录元数据解析成一张 列名 -> 字段路径 的表：内嵌
//! （flatten）字段的列提升到外层，具名嵌套字段以 `父.子` 的点分
//! 列名出现，展平后的重名是错误。

use std::collections::HashMap;

use crate::engine::Rows;
use crate::error::{Error, Result};
use crate::record::{FieldKind, FieldMeta, Record, RecordMeta, RecordType};
use crate::tags;

/// 能接收查询结果的类型；`T` 是记录元素类型
pub trait FetchInto<T> {
    fn fetch_rows(&mut self, rows: Rows) -> Result<usize>;
}

/// 把 `rows` 导出到 `obj`，返回成功导出的行数
pub fn object<T, R>(rows: Rows, obj: &mut R) -> Result<usize>
where
    R: FetchInto<T> + ?Sized,
{
    obj.fetch_rows(rows)
}

/// 旧的参数顺序
#[deprecated(since = "0.3.0", note = "use `object`; the argument order was corrected")]
pub fn obj<T, R>(obj: &mut R, rows: Rows) -> Result<usize>
where
    R: FetchInto<T> + ?Sized,
{
    object(rows, obj)
}

/// 字段最终的列名；`name(...)` 覆盖，`-` 排除
fn column_name(field: &FieldMeta) -> Result<Option<String>> {
    if field.tag.trim_start().starts_with('-') {
        return Ok(None);
    }

    let parsed = tags::parse(field.tag).map_err(|msg| Error::schema(field.name, msg))?;
    for tag in &parsed {
        if tag.name == "name" {
            let Some(arg) = tag.args.first() else {
                return Err(Error::schema(field.name, "property `name` needs an argument"));
            };
            return Ok(Some(arg.to_string()));
        }
    }
    Ok(Some(field.name.to_string()))
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// 解析记录类型为 列名 -> 字段路径 的映射
fn field_map(meta: &RecordMeta) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    walk(meta, "", "", &mut map)?;
    Ok(map)
}

fn walk(
    meta: &RecordMeta,
    col_prefix: &str,
    path_prefix: &str,
    map: &mut HashMap<String, String>,
) -> Result<()> {
    for field in meta.fields {
        let path = join(path_prefix, field.name);
        match field.kind {
            FieldKind::Column => {
                let Some(name) = column_name(field)? else {
                    continue;
                };
                let key = join(col_prefix, &name);
                if map.insert(key.clone(), path).is_some() {
                    return Err(Error::schema(
                        field.name,
                        format!("duplicate field name `{key}`"),
                    ));
                }
            }
            // 内嵌：列名保持在外层级别
            FieldKind::Flatten(inner) => walk(inner(), col_prefix, &path, map)?,
            // 具名嵌套：列名加上点分前缀
            FieldKind::Nested(inner) => {
                let Some(name) = column_name(field)? else {
                    continue;
                };
                walk(inner(), &join(col_prefix, &name), &path, map)?;
            }
        }
    }
    Ok(())
}

fn scan_row(
    rec: &mut dyn Record,
    map: &HashMap<String, String>,
    columns: &[String],
    cells: Vec<crate::value::Value>,
) -> Result<()> {
    for (col, value) in columns.iter().zip(cells) {
        if let Some(path) = map.get(col) {
            rec.set(path, value)?;
        }
    }
    Ok(())
}

fn run_hook(rec: &mut dyn Record, count: usize) -> Result<()> {
    rec.after_fetch().map_err(|err| Error::AfterFetch {
        count,
        source: Box::new(err),
    })
}

impl<T: Record + RecordType> FetchInto<T> for T {
    /// 单条记录：只取第一行，之后的行忽略
    fn fetch_rows(&mut self, rows: Rows) -> Result<usize> {
        let map = field_map(T::record_meta())?;
        let Rows { columns, rows } = rows;

        let Some(cells) = rows.into_iter().next() else {
            return Ok(0);
        };
        scan_row(self, &map, &columns, cells)?;
        run_hook(self, 0)?;
        Ok(1)
    }
}

impl<T: Record + RecordType + Default> FetchInto<T> for Vec<T> {
    /// 覆盖已有元素，不够时增长
    fn fetch_rows(&mut self, rows: Rows) -> Result<usize> {
        let map = field_map(T::record_meta())?;
        let Rows { columns, rows } = rows;

        let mut count = 0;
        for (i, cells) in rows.into_iter().enumerate() {
            if i >= self.len() {
                self.push(T::default());
            }
            let item = &mut self[i];
            scan_row(item, &map, &columns, cells)?;
            run_hook(item, count)?;
            count += 1;
        }
        Ok(count)
    }
}

impl<T: Record + RecordType> FetchInto<T> for [T] {
    /// 至多填充 `len` 行，多余的行丢弃
    fn fetch_rows(&mut self, rows: Rows) -> Result<usize> {
        let map = field_map(T::record_meta())?;
        let Rows { columns, rows } = rows;

        let mut count = 0;
        for (item, cells) in self.iter_mut().zip(rows) {
            scan_row(item, &map, &columns, cells)?;
            run_hook(item, count)?;
            count += 1;
        }
        Ok(count)
    }
}

impl<T: Record + RecordType, const N: usize> FetchInto<T> for [T; N] {
    fn fetch_rows(&mut self, rows: Rows) -> Result<usize> {
        <[T] as FetchInto<T>>::fetch_rows(self.as_mut_slice(), rows)
    }
}
