//! 模型编译与进程级注册表
//!
//! 把记录的静态字段描述（含标签原文）编译成 [`Model`]：列集合、主键、
//! 自增列、乐观锁列、索引、外键、check 约束与表级 Meta。模型在首次
//! 使用时编译，并以类型为键缓存在进程级注册表中，编译完成后不可变。

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::record::{FieldKind, Record, RecordMeta};
use crate::tags::{self, Tag};
use crate::value::{NativeType, Value};

/// 约束种类，约束名在所有种类之间必须唯一（比较时不区分大小写）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintKind {
    Index,
    Unique,
    ForeignKey,
    Check,
}

impl ConstraintKind {
    fn name(self) -> &'static str {
        match self {
            ConstraintKind::Index => "KEY INDEX",
            ConstraintKind::Unique => "UNIQUE INDEX",
            ConstraintKind::ForeignKey => "FOREIGN KEY",
            ConstraintKind::Check => "CHECK",
        }
    }
}

/// 外键更新/删除规则的封闭集合
const FK_RULES: &[&str] = &["", "NO ACTION", "CASCADE", "SET NULL", "SET DEFAULT", "RESTRICT"];

/// 外键约束
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// 本表列在 `Model::cols` 中的下标
    pub col: usize,
    /// 被引用的表名，允许带 `#` 前缀标记（渲染 DDL 时替换为表名前缀）
    pub ref_table: String,
    pub ref_col: String,
    /// 规范化为大写；空串表示不渲染该子句
    pub update_rule: String,
    pub delete_rule: String,
}

/// 一个持久化列
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// 数据库列名
    pub name: String,
    /// 内存字段路径，嵌入字段为点分形式（如 `addr.city`）
    pub field: String,
    pub native: NativeType,
    pub len1: Option<u32>,
    pub len2: Option<u32>,
    pub nullable: bool,
    /// 默认值字面量
    pub default: Option<String>,
    /// 是否自增列
    pub ai: bool,
    /// 缓存的零值，用于快速判零
    pub zero: Value,
}

impl Column {
    fn new(name: String, field: String, native: NativeType) -> Self {
        Column {
            name,
            field,
            nullable: native.nullable,
            zero: native.zero(),
            native,
            len1: None,
            len2: None,
            default: None,
            ai: false,
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// 与缓存零值比较。字节列只比较长度，`b""` 与空 `Vec` 都算零，
    /// `b"0"` 不算。
    pub fn is_zero(&self, value: &Value) -> bool {
        match (value, &self.zero) {
            (Value::Bytes(Some(v)), Value::Bytes(Some(z))) if z.is_empty() => v.is_empty(),
            _ => value == &self.zero,
        }
    }
}

/// 一个记录类型编译后的表结构
#[derive(Debug)]
pub struct Model {
    /// 表名（未加引擎前缀）
    pub name: String,
    /// 声明顺序的列集合
    pub cols: Vec<Column>,
    /// 主键列下标，有序
    pub pk: Vec<usize>,
    /// 自增列下标，至多一个
    pub ai: Option<usize>,
    pub ai_start: Option<u64>,
    pub ai_step: Option<u64>,
    /// 乐观锁列下标，至多一个
    pub occ: Option<usize>,
    /// 唯一索引，保持声明顺序（keyed WHERE 依次尝试）
    pub unique_indexes: Vec<(String, Vec<usize>)>,
    pub key_indexes: Vec<(String, Vec<usize>)>,
    pub fks: Vec<(String, ForeignKey)>,
    pub checks: Vec<(String, String)>,
    /// 表级键值项（如 `mysql_engine`），保持声明顺序
    pub meta: Vec<(String, Vec<String>)>,

    // 小写约束名 -> 种类，保证跨种类唯一
    constraints: HashMap<String, ConstraintKind>,
}

impl Model {
    /// 从静态字段描述编译模型
    pub fn compile(meta: &RecordMeta) -> Result<Model> {
        let mut m = Model {
            name: meta.name.to_string(),
            cols: Vec::new(),
            pk: Vec::new(),
            ai: None,
            ai_start: None,
            ai_step: None,
            occ: None,
            unique_indexes: Vec::new(),
            key_indexes: Vec::new(),
            fks: Vec::new(),
            checks: Vec::new(),
            meta: Vec::new(),
            constraints: HashMap::new(),
        };

        m.parse_meta(meta)?;
        m.walk_fields(meta, "")?;
        m.finalize()?;
        Ok(m)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.cols.iter().find(|c| c.name == name)
    }

    /// 表级 Meta 中某个键的值序列
    pub fn meta_values(&self, key: &str) -> Option<&[String]> {
        self.meta
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn ai_col(&self) -> Option<&Column> {
        self.ai.map(|i| &self.cols[i])
    }

    pub fn occ_col(&self) -> Option<&Column> {
        self.occ.map(|i| &self.cols[i])
    }

    // ========== 结构体级标签 ==========

    fn parse_meta(&mut self, meta: &RecordMeta) -> Result<()> {
        let tags = tags::parse(meta.tag).map_err(|msg| Error::schema(meta.name, msg))?;

        for tag in tags {
            match tag.name {
                "name" => {
                    expect_args(meta.name, &tag, 1, 1)?;
                    self.name = tag.args[0].to_string();
                }
                "check" => {
                    expect_args(meta.name, &tag, 2, 2)?;
                    self.claim_constraint(meta.name, tag.args[0], ConstraintKind::Check)?;
                    self.checks
                        .push((tag.args[0].to_string(), tag.args[1].to_string()));
                }
                // 由 derive 消化的结构性标记，这里跳过
                "after_fetch" => {
                    expect_args(meta.name, &tag, 0, 0)?;
                }
                // 其余属性一律进入表级 Meta
                key => {
                    self.meta.push((
                        key.to_string(),
                        tag.args.iter().map(|a| a.to_string()).collect(),
                    ));
                }
            }
        }

        Ok(())
    }

    // ========== 字段遍历 ==========

    fn walk_fields(&mut self, meta: &RecordMeta, prefix: &str) -> Result<()> {
        for field in meta.fields {
            let path = if prefix.is_empty() {
                field.name.to_string()
            } else {
                format!("{prefix}.{}", field.name)
            };

            match field.kind {
                FieldKind::Column => {
                    let native = field.native.ok_or_else(|| {
                        Error::schema(&path, "column field without a native type")
                    })?;
                    self.parse_column(&path, field.tag, native)?;
                }
                FieldKind::Flatten(inner) => self.walk_fields(inner(), &path)?,
                // 具名嵌套不产生列，仅对结果集映射可见
                FieldKind::Nested(_) => {}
            }
        }
        Ok(())
    }

    fn parse_column(&mut self, path: &str, tag: &str, native: NativeType) -> Result<()> {
        let rust_name = path.rsplit('.').next().unwrap_or(path);
        let mut col = Column::new(rust_name.to_string(), path.to_string(), native);

        let tags = tags::parse(tag).map_err(|msg| Error::schema(path, msg))?;
        let idx = self.cols.len();

        // 先确定列名，索引、外键等属性都以最终列名报错
        for tag in &tags {
            if tag.name == "name" {
                expect_args(path, tag, 1, 1)?;
                col.name = tag.args[0].to_string();
            }
        }

        if self.cols.iter().any(|c| c.name == col.name) {
            return Err(Error::schema(
                path,
                format!("duplicate column name `{}`", col.name),
            ));
        }

        for tag in &tags {
            match tag.name {
                "name" => {} // 已处理
                "len" => self.set_len(&mut col, path, tag)?,
                "nullable" => self.set_nullable(&mut col, path, tag)?,
                "pk" => self.set_pk(idx, path, tag)?,
                "ai" => self.set_ai(&mut col, idx, path, tag)?,
                "unique" => self.set_index(idx, path, tag, ConstraintKind::Unique)?,
                "index" => self.set_index(idx, path, tag, ConstraintKind::Index)?,
                "fk" => self.set_fk(idx, path, tag)?,
                "occ" => self.set_occ(idx, path, tag)?,
                "default" => self.set_default(&mut col, path, tag)?,
                other => {
                    return Err(Error::schema(
                        path,
                        format!("unknown property `{other}`"),
                    ));
                }
            }
        }

        self.cols.push(col);
        Ok(())
    }

    // ========== 列属性 ==========

    fn set_len(&mut self, col: &mut Column, path: &str, tag: &Tag) -> Result<()> {
        expect_args(path, tag, 0, 2)?;
        let mut lens = tag.args.iter().map(|a| {
            a.parse::<u32>()
                .map_err(|_| Error::schema(path, format!("invalid length `{a}`")))
        });
        if let Some(v) = lens.next() {
            col.len1 = Some(v?);
        }
        if let Some(v) = lens.next() {
            col.len2 = Some(v?);
        }
        Ok(())
    }

    fn set_nullable(&mut self, col: &mut Column, path: &str, tag: &Tag) -> Result<()> {
        expect_args(path, tag, 0, 1)?;
        col.nullable = match tag.args.first() {
            None => true,
            Some(arg) => parse_bool(path, arg)?,
        };
        Ok(())
    }

    fn set_pk(&mut self, idx: usize, path: &str, tag: &Tag) -> Result<()> {
        expect_args(path, tag, 0, 0)?;
        // AI 列隐含主键，不允许再显式声明
        if self.ai == Some(idx) {
            return Err(Error::schema(path, "auto-increment column is already the primary key"));
        }
        self.pk.push(idx);
        Ok(())
    }

    fn set_ai(&mut self, col: &mut Column, idx: usize, path: &str, tag: &Tag) -> Result<()> {
        expect_args(path, tag, 0, 2)?;
        if self.ai.is_some() {
            return Err(Error::schema(path, "model already has an auto-increment column"));
        }
        if !col.native.is_integer() {
            return Err(Error::schema(path, "auto-increment column must be integer typed"));
        }

        let mut nums = tag.args.iter().map(|a| {
            a.parse::<u64>()
                .map_err(|_| Error::schema(path, format!("invalid auto-increment value `{a}`")))
        });
        if let Some(v) = nums.next() {
            self.ai_start = Some(v?);
        }
        if let Some(v) = nums.next() {
            self.ai_step = Some(v?);
        }

        col.ai = true;
        self.ai = Some(idx);
        Ok(())
    }

    fn set_index(&mut self, idx: usize, path: &str, tag: &Tag, kind: ConstraintKind) -> Result<()> {
        expect_args(path, tag, 1, 1)?;
        let name = tag.args[0];

        let list = match kind {
            ConstraintKind::Unique => &mut self.unique_indexes,
            _ => &mut self.key_indexes,
        };
        if let Some((_, cols)) = list.iter_mut().find(|(n, _)| n == name) {
            cols.push(idx);
            return Ok(());
        }

        self.claim_constraint(path, name, kind)?;
        let list = match kind {
            ConstraintKind::Unique => &mut self.unique_indexes,
            _ => &mut self.key_indexes,
        };
        list.push((name.to_string(), vec![idx]));
        Ok(())
    }

    fn set_fk(&mut self, idx: usize, path: &str, tag: &Tag) -> Result<()> {
        expect_args(path, tag, 3, 5)?;
        let name = tag.args[0];
        self.claim_constraint(path, name, ConstraintKind::ForeignKey)?;

        let update_rule = fk_rule(path, tag.args.get(3).copied().unwrap_or(""))?;
        let delete_rule = fk_rule(path, tag.args.get(4).copied().unwrap_or(""))?;

        self.fks.push((
            name.to_string(),
            ForeignKey {
                col: idx,
                ref_table: tag.args[1].to_string(),
                ref_col: tag.args[2].to_string(),
                update_rule,
                delete_rule,
            },
        ));
        Ok(())
    }

    fn set_occ(&mut self, idx: usize, path: &str, tag: &Tag) -> Result<()> {
        expect_args(path, tag, 0, 1)?;
        if let Some(arg) = tag.args.first() {
            if !parse_bool(path, arg)? {
                return Ok(());
            }
        }
        if self.occ.is_some() {
            return Err(Error::schema(path, "model already has an occ column"));
        }
        self.occ = Some(idx);
        Ok(())
    }

    fn set_default(&mut self, col: &mut Column, path: &str, tag: &Tag) -> Result<()> {
        expect_args(path, tag, 1, 1)?;
        col.default = Some(tag.args[0].to_string());
        Ok(())
    }

    fn claim_constraint(&mut self, path: &str, name: &str, kind: ConstraintKind) -> Result<()> {
        let key = name.to_lowercase();
        if let Some(existing) = self.constraints.get(&key) {
            return Err(Error::schema(
                path,
                format!("constraint name `{name}` already used by {}", existing.name()),
            ));
        }
        self.constraints.insert(key, kind);
        Ok(())
    }

    // ========== 跨列校验 ==========

    fn finalize(&mut self) -> Result<()> {
        if let Some(ai) = self.ai {
            let col = &self.cols[ai];
            if col.nullable {
                return Err(Error::schema(
                    &col.name,
                    "auto-increment column cannot be nullable",
                ));
            }
            if col.has_default() {
                return Err(Error::schema(
                    &col.name,
                    "auto-increment column cannot have a default value",
                ));
            }

            // AI 隐含主键；已有主键时只允许恰好是 AI 自己
            if self.pk.is_empty() {
                self.pk.push(ai);
            } else if self.pk != [ai] {
                return Err(Error::schema(
                    &self.cols[ai].name,
                    "auto-increment column must be the sole primary key",
                ));
            }
        }

        if self.pk.len() == 1 {
            let col = &self.cols[self.pk[0]];
            if col.has_default() && !col.ai {
                return Err(Error::schema(
                    &col.name,
                    "single-column primary key cannot have a default value",
                ));
            }
        }

        if let Some(occ) = self.occ {
            let col = &self.cols[occ];
            if !col.native.is_integer() {
                return Err(Error::schema(&col.name, "occ column must be integer typed"));
            }
            if col.nullable {
                return Err(Error::schema(&col.name, "occ column cannot be nullable"));
            }
            if self.ai == Some(occ) {
                return Err(Error::schema(
                    &col.name,
                    "occ column cannot be the auto-increment column",
                ));
            }
        }

        Ok(())
    }
}

fn expect_args(path: &str, tag: &Tag, min: usize, max: usize) -> Result<()> {
    let n = tag.args.len();
    if n < min || n > max {
        return Err(Error::schema(
            path,
            format!("property `{}` takes {min}..={max} arguments, got {n}", tag.name),
        ));
    }
    Ok(())
}

fn parse_bool(path: &str, arg: &str) -> Result<bool> {
    match arg.to_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(Error::schema(path, format!("invalid boolean `{arg}`"))),
    }
}

fn fk_rule(path: &str, raw: &str) -> Result<String> {
    let rule = raw.trim().to_uppercase();
    if FK_RULES.contains(&rule.as_str()) {
        Ok(rule)
    } else {
        Err(Error::schema(
            path,
            format!("invalid foreign key rule `{raw}`"),
        ))
    }
}

// ========== 进程级注册表 ==========

type Registry = HashMap<TypeId, Arc<Model>>;

static MODELS: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    MODELS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// 取记录类型对应的模型，首次使用时编译并缓存
///
/// 并发读安全；未命中时持写锁编译插入，发布的模型总是完整初始化的。
pub fn model_of(rec: &dyn Record) -> Result<Arc<Model>> {
    let key = rec.type_id();

    {
        let cache = registry().read().unwrap_or_else(PoisonError::into_inner);
        if let Some(m) = cache.get(&key) {
            return Ok(Arc::clone(m));
        }
    }

    let model = Arc::new(Model::compile(rec.meta())?);
    let mut cache = registry().write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(cache.entry(key).or_insert(model)))
}

/// 清空模型注册表，主要用于测试隔离
pub fn clear_models() {
    if let Some(lock) = MODELS.get() {
        lock.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// 当前缓存的模型数量
pub fn model_count() -> usize {
    MODELS
        .get()
        .map(|l| l.read().unwrap_or_else(PoisonError::into_inner).len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldKind, FieldMeta, RecordMeta};
    use crate::value::{ColumnType, Kind};

    fn field(name: &'static str, tag: &'static str, native: NativeType) -> FieldMeta {
        FieldMeta {
            name,
            tag,
            native: Some(native),
            kind: FieldKind::Column,
        }
    }

    fn admin_meta() -> &'static RecordMeta {
        static FIELDS: OnceLock<Vec<FieldMeta>> = OnceLock::new();
        static META: OnceLock<RecordMeta> = OnceLock::new();

        let fields = FIELDS.get_or_init(|| {
            vec![
                field("id", "name(id);ai", i64::NATIVE),
                field("username", "index(index_name);len(50)", String::NATIVE),
                field("group", "name(group);fk(fk_name,#groups,id,NO ACTION)", i64::NATIVE),
                field("email", "unique(unique_email)", <Option<String>>::NATIVE),
            ]
        });
        META.get_or_init(|| RecordMeta {
            name: "Admin",
            tag: "name(administrators);check(chk_name,{id}>0);mysql_engine(innodb);mysql_charset(utf-8)",
            fields: fields.as_slice(),
        })
    }

    #[test]
    fn test_compile_admin() {
        let m = Model::compile(admin_meta()).unwrap();

        assert_eq!(m.name, "administrators");
        assert_eq!(m.cols.len(), 4);

        let id = m.column_by_name("id").unwrap();
        assert!(id.ai);
        assert!(!id.nullable);

        // ai 隐含主键
        assert_eq!(m.pk, vec![0]);
        assert_eq!(m.ai, Some(0));

        let username = m.column_by_name("username").unwrap();
        assert_eq!(username.len1, Some(50));
        assert!(!username.nullable);

        // Option 字段默认可空
        let email = m.column_by_name("email").unwrap();
        assert!(email.nullable);
        assert_eq!(email.zero, Value::Str(None));

        assert_eq!(m.key_indexes, vec![("index_name".to_string(), vec![1])]);
        assert_eq!(m.unique_indexes, vec![("unique_email".to_string(), vec![3])]);

        let (name, fk) = &m.fks[0];
        assert_eq!(name, "fk_name");
        assert_eq!(fk.col, 2);
        assert_eq!(fk.ref_table, "#groups");
        assert_eq!(fk.ref_col, "id");
        assert_eq!(fk.update_rule, "NO ACTION");
        assert_eq!(fk.delete_rule, "");

        assert_eq!(m.checks, vec![("chk_name".to_string(), "{id}>0".to_string())]);
        assert_eq!(m.meta_values("mysql_engine"), Some(&["innodb".to_string()][..]));
        assert_eq!(m.meta_values("mysql_charset"), Some(&["utf-8".to_string()][..]));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let a = Model::compile(admin_meta()).unwrap();
        let b = Model::compile(admin_meta()).unwrap();
        assert_eq!(a.name, b.name);
        assert_eq!(a.cols, b.cols);
        assert_eq!(a.pk, b.pk);
        assert_eq!(a.unique_indexes, b.unique_indexes);
        assert_eq!(a.key_indexes, b.key_indexes);
        assert_eq!(a.fks, b.fks);
    }

    fn one_field_meta(fields: Vec<FieldMeta>, tag: &'static str) -> RecordMeta {
        // 泄漏到 'static：仅测试使用
        RecordMeta {
            name: "T",
            tag,
            fields: Box::leak(fields.into_boxed_slice()),
        }
    }

    #[test]
    fn test_ai_nullable_is_error() {
        let meta = one_field_meta(
            vec![field("id", "name(id);ai", <Option<i64>>::NATIVE)],
            "",
        );
        let err = Model::compile(&meta).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("id"), "error should reference the column: {msg}");
        assert!(msg.contains("nullable"));
    }

    #[test]
    fn test_ai_must_be_integer() {
        let meta = one_field_meta(vec![field("id", "ai", String::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_ai_with_default_is_error() {
        let meta = one_field_meta(vec![field("id", "ai;default(1)", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_pk_on_ai_is_error() {
        let meta = one_field_meta(vec![field("id", "ai;pk", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_default_on_single_pk_is_error() {
        let meta = one_field_meta(vec![field("id", "pk;default(1)", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());

        // 复合主键的成员可以有默认值
        let meta = one_field_meta(
            vec![
                field("a", "pk;default(1)", i64::NATIVE),
                field("b", "pk", i64::NATIVE),
            ],
            "",
        );
        assert!(Model::compile(&meta).is_ok());
    }

    #[test]
    fn test_unknown_property() {
        let meta = one_field_meta(vec![field("id", "not-exists-property(p1)", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_name_arity() {
        let meta = one_field_meta(vec![field("id", "name(m1,m2)", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_len_arity_and_values() {
        let meta = one_field_meta(vec![field("s", "len(1,2,3)", String::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());

        let meta = one_field_meta(vec![field("s", "len(1,one)", String::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());

        let meta = one_field_meta(vec![field("s", "len(-1)", String::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_duplicate_column_name() {
        let meta = one_field_meta(
            vec![
                field("a", "name(x)", i64::NATIVE),
                field("b", "name(x)", i64::NATIVE),
            ],
            "",
        );
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_constraint_names_unique_across_kinds() {
        let meta = one_field_meta(
            vec![
                field("a", "index(c1)", i64::NATIVE),
                field("b", "unique(C1)", i64::NATIVE), // 大小写不敏感
            ],
            "",
        );
        assert!(Model::compile(&meta).is_err());

        let meta = one_field_meta(vec![field("a", "index(c1)", i64::NATIVE)], "check(c1,a>0)");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_composite_index_keeps_order() {
        let meta = one_field_meta(
            vec![
                field("a", "unique(u);name(a)", i64::NATIVE),
                field("b", "unique(u);name(b)", i64::NATIVE),
            ],
            "",
        );
        let m = Model::compile(&meta).unwrap();
        assert_eq!(m.unique_indexes, vec![("u".to_string(), vec![0, 1])]);
    }

    #[test]
    fn test_occ_rules() {
        let meta = one_field_meta(vec![field("v", "occ", i64::NATIVE)], "");
        let m = Model::compile(&meta).unwrap();
        assert_eq!(m.occ, Some(0));

        // occ(false) 等于没有声明
        let meta = one_field_meta(vec![field("v", "occ(false)", i64::NATIVE)], "");
        assert_eq!(Model::compile(&meta).unwrap().occ, None);

        // 非整数列
        let meta = one_field_meta(vec![field("v", "occ", String::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());

        // 可空列
        let meta = one_field_meta(vec![field("v", "occ", <Option<i64>>::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());

        // 不能同时是 AI
        let meta = one_field_meta(vec![field("v", "occ;ai", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());

        // 参数不合法
        let meta = one_field_meta(vec![field("v", "occ(xx123)", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_fk_rules_closed_set() {
        let meta = one_field_meta(
            vec![field("g", "fk(f1,groups,id,cascade,set null)", i64::NATIVE)],
            "",
        );
        let m = Model::compile(&meta).unwrap();
        assert_eq!(m.fks[0].1.update_rule, "CASCADE");
        assert_eq!(m.fks[0].1.delete_rule, "SET NULL");

        let meta = one_field_meta(vec![field("g", "fk(f1,groups,id,whatever)", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());

        let meta = one_field_meta(vec![field("g", "fk(f1,groups)", i64::NATIVE)], "");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_meta_check_arity() {
        let meta = one_field_meta(vec![field("id", "", i64::NATIVE)], "check(ck,id>0,extra)");
        assert!(Model::compile(&meta).is_err());
    }

    #[test]
    fn test_is_zero_bytes_by_length() {
        let col = Column::new(
            "b".into(),
            "b".into(),
            NativeType {
                kind: Kind::Bytes,
                nullable: false,
            },
        );
        assert!(col.is_zero(&Value::Bytes(Some(Vec::new()))));
        assert!(col.is_zero(&Value::Bytes(Some(b"".to_vec()))));
        assert!(!col.is_zero(&Value::Bytes(Some(b"0".to_vec()))));
    }
}
