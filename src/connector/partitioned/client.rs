// ==========================================
// 注入数据稳定性核对 - Presto HTTP 客户端
// ==========================================
// 协议: POST /v1/statement 提交,沿 nextUri 逐页拉取直至结束
// 参数: X-Presto-Prepared-Statement 头 + EXECUTE ... USING 类型化字面量
// ==========================================

use crate::config::PartitionedCredentials;
use crate::connector::error::{SourceError, SourceResult};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// 预编译语句名
const PREPARED_STATEMENT_NAME: &str = "audit_stmt";

const SOURCE_HEADER_VALUE: &str = "injection-audit";

// ==========================================
// PrestoValue - 绑定参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrestoValue {
    Integer(i64),
    Varchar(String),
}

impl PrestoValue {
    /// 渲染为 EXECUTE ... USING 中的字面量（字符串单引号双写）
    pub fn to_literal(&self) -> String {
        match self {
            PrestoValue::Integer(v) => v.to_string(),
            PrestoValue::Varchar(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

// ==========================================
// PrestoStatement - 带参数的语句
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrestoStatement {
    sql: String,
    params: Vec<PrestoValue>,
}

impl PrestoStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, value: PrestoValue) -> Self {
        self.params.push(value);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[PrestoValue] {
        &self.params
    }

    /// 请求体: 无参数时为原 SQL,否则为 EXECUTE 语句
    pub fn request_body(&self) -> String {
        if self.params.is_empty() {
            return self.sql.clone();
        }
        let literals: Vec<String> = self.params.iter().map(PrestoValue::to_literal).collect();
        format!("EXECUTE {} USING {}", PREPARED_STATEMENT_NAME, literals.join(", "))
    }

    /// X-Presto-Prepared-Statement 头（仅有参数时需要）
    pub fn prepared_header(&self) -> Option<String> {
        if self.params.is_empty() {
            return None;
        }
        let encoded: String = url::form_urlencoded::byte_serialize(self.sql.as_bytes()).collect();
        Some(format!("{}={}", PREPARED_STATEMENT_NAME, encoded))
    }
}

impl fmt::Display for PrestoStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

// ==========================================
// 协议响应结构
// ==========================================
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    next_uri: Option<String>,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    error: Option<QueryFailure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryFailure {
    message: String,
    #[serde(default)]
    error_name: Option<String>,
}

// ==========================================
// PrestoClient
// ==========================================
pub struct PrestoClient {
    http: Client,
    base_url: String,
    user: String,
    catalog: String,
    schema: String,
}

impl PrestoClient {
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        catalog: impl Into<String>,
        schema: impl Into<String>,
    ) -> SourceResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user: user.into(),
            catalog: catalog.into(),
            schema: schema.into(),
        })
    }

    pub fn from_credentials(credentials: &PartitionedCredentials) -> SourceResult<Self> {
        Self::new(
            credentials.base_url(),
            credentials.user.clone(),
            credentials.catalog.clone(),
            credentials.schema.clone(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 探测协调节点是否可达（GET /v1/info）
    pub fn ping(&self) -> SourceResult<()> {
        let response = self
            .http
            .get(format!("{}/v1/info", self.base_url))
            .send()
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Connection(format!(
                "{} 返回 HTTP {}",
                self.base_url,
                response.status()
            )));
        }
        Ok(())
    }

    /// 执行语句并返回全部数据行
    pub fn query(&self, statement: &PrestoStatement) -> SourceResult<Vec<Vec<Value>>> {
        let mut request = self
            .http
            .post(format!("{}/v1/statement", self.base_url))
            .header("X-Presto-User", &self.user)
            .header("X-Presto-Catalog", &self.catalog)
            .header("X-Presto-Schema", &self.schema)
            .header("X-Presto-Source", SOURCE_HEADER_VALUE)
            .body(statement.request_body());

        if let Some(prepared) = statement.prepared_header() {
            request = request.header("X-Presto-Prepared-Statement", prepared);
        }

        let mut page = decode_page(request.send()?)?;
        let mut rows = Vec::new();

        loop {
            if let Some(failure) = page.error.take() {
                return Err(SourceError::Query(format!(
                    "{}{}",
                    failure
                        .error_name
                        .map(|name| format!("{}: ", name))
                        .unwrap_or_default(),
                    failure.message
                )));
            }
            if let Some(data) = page.data.take() {
                rows.extend(data);
            }
            match page.next_uri.take() {
                Some(next) => {
                    tracing::trace!(query_id = ?page.id, next_uri = %next, "拉取下一页");
                    page = decode_page(
                        self.http
                            .get(&next)
                            .header("X-Presto-User", &self.user)
                            .send()?,
                    )?;
                }
                None => break,
            }
        }

        Ok(rows)
    }

    /// 执行返回单个计数的语句（无数据行视为 0）
    pub fn query_count(&self, statement: &PrestoStatement) -> SourceResult<i64> {
        let rows = self.query(statement)?;
        let Some(cell) = rows.first().and_then(|row| row.first()) else {
            return Ok(0);
        };
        match cell {
            Value::Null => Ok(0),
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| SourceError::Protocol(format!("计数不是整数: {}", n))),
            other => Err(SourceError::Protocol(format!("计数列类型错误: {}", other))),
        }
    }
}

fn decode_page(response: Response) -> SourceResult<QueryResults> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(SourceError::Query(format!("HTTP {}: {}", status, body.trim())));
    }
    response
        .json::<QueryResults>()
        .map_err(|e| SourceError::Protocol(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varchar_literal_escapes_quotes() {
        let v = PrestoValue::Varchar("10.1' OR '1'='1".to_string());
        assert_eq!(v.to_literal(), "'10.1'' OR ''1''=''1'");
        assert_eq!(PrestoValue::Integer(-3).to_literal(), "-3");
    }

    #[test]
    fn test_statement_without_params_is_sent_verbatim() {
        let stmt = PrestoStatement::new("SELECT 1");
        assert_eq!(stmt.request_body(), "SELECT 1");
        assert!(stmt.prepared_header().is_none());
    }

    #[test]
    fn test_statement_with_params_uses_execute() {
        let stmt = PrestoStatement::new("SELECT * FROM t WHERE a = ? AND b LIKE ?")
            .bind(PrestoValue::Integer(7))
            .bind(PrestoValue::Varchar("%10.1%".to_string()));

        assert_eq!(stmt.request_body(), "EXECUTE audit_stmt USING 7, '%10.1%'");
        let header = stmt.prepared_header().unwrap();
        assert!(header.starts_with("audit_stmt=SELECT+*+FROM+t"));
        assert!(!header.contains(' '));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = PrestoClient::new("http://coord:8080/", "u", "hive", "default").unwrap();
        assert_eq!(client.base_url(), "http://coord:8080");
    }
}
