//! 执行前的 SQL 改写
//!
//! SQL 组装阶段使用三种内联标记：`{name}` 表示需要引用的标识符，
//! `{#name}` 表示加上引擎表名前缀的表标识符，`?` 表示位置参数。
//! 占位符翻译在每次执行前无条件进行；标记展开则由调用方通过
//! `rewrite` 开关控制。

use crate::dialect::Dialect;

/// 按引擎配置做完整改写：可选的标记展开 + 无条件的占位符翻译
pub fn apply(dialect: &dyn Dialect, prefix: &str, rewrite: bool, sql: &str) -> String {
    let expanded;
    let sql = if rewrite {
        expanded = expand(dialect, prefix, sql);
        expanded.as_str()
    } else {
        sql
    };
    placeholders(dialect, sql)
}

/// 展开 `{name}` 与 `{#name}` 标记
pub fn expand(dialect: &dyn Dialect, prefix: &str, sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 16);
    let mut rest = sql;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];

        let Some(close) = tail.find('}') else {
            // 没有闭合，剩余部分原样输出
            out.push('{');
            out.push_str(tail);
            return out;
        };

        let name = &tail[..close];
        match name.strip_prefix('#') {
            Some(table) => dialect.quote(&mut out, &format!("{prefix}{table}")),
            None => dialect.quote(&mut out, name),
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

/// 把 `?` 翻译成方言的原生占位符形式，保持参数顺序
pub fn placeholders(dialect: &dyn Dialect, sql: &str) -> String {
    if !dialect.numbered_placeholders() {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0usize;
    for ch in sql.chars() {
        if ch == '?' {
            index += 1;
            out.push('$');
            out.push_str(&index.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}
