//! tagorm：标签驱动的 ORM 核心
//!
//! 用一小段标签语言描述记录与表的对应关系，运行期编译成模型并缓存，
//! 再由方言层生成 DDL/DML，结果集按接收器的形状映射回记录：
//!
//! ```ignore
//! use tagorm::{Db, EngineExt, Record};
//!
//! #[derive(Record, Default)]
//! #[orm("name(users);mysql_engine(innodb)")]
//! struct User {
//!     #[orm("name(id);ai")]
//!     id: i64,
//!     #[orm("unique(u_email);len(100)")]
//!     email: String,
//!     #[orm("len(20)")]
//!     nickname: String,
//! }
//!
//! let db = Db::connect("sqlite::memory:", "app_").await?;
//! db.create(&User::default()).await?;
//! db.insert(&User { email: "a@b".into(), nickname: "n".into(), ..Default::default() }).await?;
//!
//! let mut u = User { email: "a@b".into(), ..Default::default() };
//! db.find(&mut u).await?;
//! ```
//!
//! 模块划分：[`tags`] 是标签词法，[`model`] 是模型编译器与注册表，
//! [`dialect`] 生成方言相关的 SQL，[`crud`] 合成增删改查，
//! [`fetch`] 负责结果集到记录的映射，[`engine`]/[`transaction`]
//! 是基于 sqlx 的执行引擎。

pub mod crud;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod model;
pub mod record;
pub mod rewrite;
pub mod tags;
pub mod transaction;
pub mod value;

pub use crud::EngineExt;
pub use dialect::{Dialect, Mysql, Postgres, Sqlite3};
pub use engine::{Db, DbDriver, Engine, ExecResult, Rows, Stmt};
pub use error::{Error, Result};
pub use fetch::FetchInto;
pub use model::{clear_models, model_count, model_of, Column, ForeignKey, Model};
pub use record::{AfterFetch, FieldKind, FieldMeta, Record, RecordMeta, RecordType};
pub use transaction::Tx;
pub use value::{ColumnType, Kind, NativeType, Value};

// derive 宏与同名 trait 处于不同命名空间，一并从根导出
pub use tagorm_derive::Record;
