use thiserror::Error;

/// tagorm 的错误类型
///
/// 模型编译期的问题统一归入 [`Error::Schema`]，并携带出错的字段名；
/// 驱动层的错误原样包装在 [`Error::Driver`] 中向上传递，不做重试。
#[derive(Debug, Error)]
pub enum Error {
    /// 标签解析或模型约束校验失败
    #[error("schema error on field `{field}`: {message}")]
    Schema { field: String, message: String },

    /// 扫描结果集时列值与字段类型不匹配
    #[error("invalid value kind for field `{field}`: expected {expected}")]
    InvalidKind {
        field: String,
        expected: &'static str,
    },

    /// 无法从主键或唯一索引构造 WHERE 语句
    #[error("no primary key or unique index value available for WHERE clause")]
    NoWhereKey,

    /// INSERT/UPDATE 没有产生任何列
    #[error("statement would contain no columns")]
    NoColumns,

    /// 批量插入中混入了不同类型的记录
    #[error("batch insert with heterogeneous record types")]
    HeterogeneousBatch,

    /// 驱动层错误
    #[error("database error: {0}")]
    Driver(#[from] sqlx::Error),

    /// AfterFetch 钩子返回错误，`count` 为出错前已成功导出的行数
    #[error("after-fetch hook failed after {count} rows")]
    AfterFetch {
        count: usize,
        #[source]
        source: Box<Error>,
    },

    /// 当前驱动没有可用的连接池
    #[error("no connection pool available for driver")]
    NoPool,

    #[error("unsupported database URL: {0}")]
    UnsupportedDatabase(String),
}

impl Error {
    /// 构造一个模型编译错误
    pub fn schema(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 为 [`Error::InvalidKind`] 补上字段名，其它错误原样返回。
    /// `ColumnType::from_value` 产生错误时并不知道字段名，由调用方在此补齐。
    pub fn for_field(self, field: &str) -> Self {
        match self {
            Error::InvalidKind { expected, .. } => Error::InvalidKind {
                field: field.to_string(),
                expected,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
