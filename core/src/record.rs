//! 记录能力与静态元数据
//!
//! `#[derive(Record)]` 为用户结构体生成一张静态的字段描述表
//! （[`RecordMeta`] / [`FieldMeta`]）以及按字段路径取值、赋值的访问器。
//! 模型编译器与结果集映射都只依赖这层能力，手写实现与宏生成实现
//! 完全等价（核心自身的单元测试即采用手写实现）。

use std::any::Any;

use crate::error::Result;
use crate::value::{NativeType, Value};

/// 字段在结构上的角色
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// 普通列
    Column,
    /// 内嵌记录：内层的列提升到外层模型（匿名嵌入的对应物）
    Flatten(fn() -> &'static RecordMeta),
    /// 具名嵌套：仅以 `父.子` 形式的点分路径暴露给结果集映射
    Nested(fn() -> &'static RecordMeta),
}

/// 单个字段的静态描述
///
/// `tag` 保存 `orm` 标签原文，由模型编译器惰性解析；被 `-` 排除的
/// 字段不会出现在描述表里。
pub struct FieldMeta {
    /// Rust 字段名
    pub name: &'static str,
    /// `orm` 标签原文
    pub tag: &'static str,
    /// 列字段的原生类型；嵌入/嵌套字段为 `None`
    pub native: Option<NativeType>,
    pub kind: FieldKind,
}

/// 记录类型的静态描述
pub struct RecordMeta {
    /// 类型简单名，未被 `name(...)` 覆盖时作为表名
    pub name: &'static str,
    /// 结构体级标签原文（表名、check、Meta 键值等）
    pub tag: &'static str,
    pub fields: &'static [FieldMeta],
}

/// 可持久化的记录
///
/// 对象安全：CRUD 层以 `&dyn Record` 操作记录，批量插入因此可以
/// 在运行期发现混入的异类记录。`get`/`set` 的字段参数是（可能点分的）
/// 字段路径；`set` 返回 `Ok(false)` 表示路径不存在，调用方据此丢弃
/// 结果集中无法识别的列。
pub trait Record: Any + Send + Sync {
    fn meta(&self) -> &'static RecordMeta;

    fn get(&self, field: &str) -> Option<Value>;

    fn set(&mut self, field: &str, value: Value) -> Result<bool>;

    /// 每成功导出一行后调用，默认什么都不做
    fn after_fetch(&mut self) -> Result<()> {
        Ok(())
    }
}

/// 记录元数据的静态入口，供嵌入字段与结果集接收器使用
pub trait RecordType {
    fn record_meta() -> &'static RecordMeta;
}

/// 行导出后的用户钩子
///
/// 在结构体标签中声明 `after_fetch` 后，derive 会把
/// [`Record::after_fetch`] 委托到这里的实现。
pub trait AfterFetch {
    fn after_fetch(&mut self) -> Result<()>;
}
