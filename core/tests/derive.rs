//! derive 宏与模型编译的联动测试

use tagorm::{
    fetch, model_of, AfterFetch, Dialect, FieldKind, Mysql, Record, RecordType, Rows, Value,
};

#[derive(Record, Default, Debug, PartialEq)]
#[orm("name(administrators);check(chk_id,{id}>0);mysql_engine(innodb);mysql_charset(utf-8)")]
struct Admin {
    #[orm("name(id);ai")]
    id: i64,
    #[orm("unique(unique_username);len(50)")]
    username: String,
    #[orm("name(group);fk(fk_admin_group,#groups,id,NO ACTION)")]
    group: i64,
    email: Option<String>,
    #[orm("-")]
    cached: i64,
}

#[test]
fn test_model_from_derive() {
    let m = model_of(&Admin::default()).unwrap();

    assert_eq!(m.name, "administrators");
    // cached 被排除
    assert_eq!(m.cols.len(), 4);

    let id = m.column_by_name("id").unwrap();
    assert!(id.ai);
    assert_eq!(m.pk, vec![0]);

    let username = m.column_by_name("username").unwrap();
    assert_eq!(username.len1, Some(50));
    assert!(!username.nullable);

    let email = m.column_by_name("email").unwrap();
    assert!(email.nullable);
    assert_eq!(email.zero, Value::Str(None));

    assert_eq!(m.unique_indexes.len(), 1);
    assert_eq!(m.unique_indexes[0].0, "unique_username");

    let (fk_name, fk) = &m.fks[0];
    assert_eq!(fk_name, "fk_admin_group");
    assert_eq!(fk.ref_table, "#groups");
    assert_eq!(fk.ref_col, "id");
    assert_eq!(fk.update_rule, "NO ACTION");
    assert_eq!(fk.delete_rule, "");

    assert_eq!(m.checks[0], ("chk_id".to_string(), "{id}>0".to_string()));
    assert_eq!(m.meta_values("mysql_engine"), Some(&["innodb".to_string()][..]));
}

#[test]
fn test_registry_caches_by_type() {
    let a = model_of(&Admin::default()).unwrap();
    let b = model_of(&Admin::default()).unwrap();
    // 同一类型命中同一份缓存
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn test_mysql_create_table_options_scenario() {
    let m = model_of(&Admin::default()).unwrap();
    let mut buf = String::new();
    Mysql.create_table_options(&mut buf, &m);
    assert_eq!(buf, "engine=innodb character set=utf-8");

    // 没有相关 meta 的模型不渲染任何字符
    #[derive(Record, Default)]
    struct Plain {
        #[orm("pk")]
        id: i64,
    }
    let m = model_of(&Plain::default()).unwrap();
    let mut buf = String::new();
    Mysql.create_table_options(&mut buf, &m);
    assert_eq!(buf, "");
}

#[test]
fn test_ai_nullable_error_references_column() {
    #[derive(Record, Default)]
    struct BadAi {
        #[orm("name(uid);ai;nullable")]
        id: i64,
    }

    let err = model_of(&BadAi::default()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("uid"), "{msg}");
}

#[test]
fn test_excluded_field_is_invisible() {
    // 标签里的元数据不含被排除的字段
    let fields = <Admin as RecordType>::record_meta().fields;
    assert!(fields.iter().all(|f| f.name != "cached"));

    // 查询结果里同名的列落入黑洞
    let mut a = Admin::default();
    let rows = Rows {
        columns: vec!["id".to_string(), "cached".to_string()],
        rows: vec![vec![Value::Int(Some(3)), Value::Int(Some(99))]],
    };
    fetch::object(rows, &mut a).unwrap();
    assert_eq!(a.id, 3);
    assert_eq!(a.cached, 0);
}

// ========== 内嵌与钩子 ==========

#[derive(Record, Default, Debug, PartialEq)]
struct FetchEmail {
    #[orm("unique(unique_index)")]
    email: String,
}

#[derive(Record, Default, Debug, PartialEq)]
#[orm("name(user);after_fetch")]
struct FetchUser {
    #[orm("embed")]
    base: FetchEmail,
    #[orm("name(id);ai(1,2)")]
    id: i64,
    #[orm("index(index)")]
    username: String,
    #[orm("-")]
    regdate: i64,
}

impl AfterFetch for FetchUser {
    fn after_fetch(&mut self) -> tagorm::Result<()> {
        self.regdate = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_secs() as i64;
        Ok(())
    }
}

fn email_rows(n: usize) -> Rows {
    Rows {
        columns: vec!["id".to_string(), "email".to_string()],
        rows: (0..n)
            .map(|i| {
                vec![
                    Value::Int(Some(i as i64)),
                    Value::Str(Some(format!("email-{i}"))),
                ]
            })
            .collect(),
    }
}

#[test]
fn test_embedded_columns_join_outer_model() {
    let m = model_of(&FetchUser::default()).unwrap();
    assert_eq!(m.name, "user");

    // email 提升到外层模型，字段路径带点
    let email = m.column_by_name("email").unwrap();
    assert_eq!(email.field, "base.email");
    assert_eq!(m.unique_indexes[0].0, "unique_index");

    assert_eq!(m.ai_start, Some(1));
    assert_eq!(m.ai_step, Some(2));
}

#[test]
fn test_slice_growth_scenario() {
    // 接收器长度 1、结果 2 行：Vec 增长到 2
    let mut users = vec![FetchUser::default()];
    let n = fetch::object(email_rows(2), &mut users).unwrap();
    assert_eq!(n, 2);
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].id, 0);
    assert_eq!(users[0].base.email, "email-0");
    assert_eq!(users[1].id, 1);
    assert_eq!(users[1].base.email, "email-1");

    // 切片接收器不增长，只填充第一行
    let mut fixed = vec![FetchUser::default()];
    let n = fetch::object(email_rows(2), &mut fixed[..]).unwrap();
    assert_eq!(n, 1);
    assert_eq!(fixed.len(), 1);
    assert_eq!(fixed[0].base.email, "email-0");
}

#[test]
fn test_after_fetch_scenario() {
    let mut users: Vec<FetchUser> = vec![];
    fetch::object(email_rows(2), &mut users).unwrap();
    assert!(users[0].regdate != 0);
    assert!(users[1].regdate != 0);
}

#[test]
fn test_derive_get_set_paths() {
    let mut u = FetchUser::default();
    assert!(u
        .set("base.email", Value::Str(Some("x@y".into())))
        .unwrap());
    assert_eq!(u.get("base.email"), Some(Value::Str(Some("x@y".into()))));

    // 不存在的路径返回 Ok(false)
    assert!(!u.set("nope", Value::Int(Some(1))).unwrap());
    assert_eq!(u.get("nope"), None);
}

#[test]
fn test_field_kind_metadata() {
    let fields = <FetchUser as RecordType>::record_meta().fields;
    assert!(matches!(fields[0].kind, FieldKind::Flatten(_)));
    assert!(fields[0].native.is_none());
    assert!(matches!(fields[1].kind, FieldKind::Column));
}

#[test]
fn test_duplicate_embedded_column_is_error() {
    #[derive(Record, Default)]
    struct Dup {
        email: String,
        #[orm("embed")]
        base: FetchEmail,
    }

    let err = model_of(&Dup::default()).unwrap_err();
    assert!(err.to_string().contains("duplicate"), "{err}");
}
