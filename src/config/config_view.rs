// ==========================================
// 注入数据稳定性核对 - 配置视图
// ==========================================
// 职责: 加载 config.ini,提供按节/键的只读访问
// 存储: INI 文件 (rust-ini, 关闭转义以保留密码原文)
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::{ProductType, SourceKind};
use ini::{Ini, ParseOption};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 默认配置文件名（当前工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// 用户配置目录下的子目录名
const CONFIG_DIR_NAME: &str = "injection-audit";

// ==========================================
// ConfigView - 只读配置视图
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfigView {
    sections: HashMap<String, HashMap<String, String>>,
    section_order: Vec<String>,
}

impl ConfigView {
    /// 从文件加载配置
    ///
    /// # 错误
    /// - NotFound: 文件不存在
    /// - Parse: INI 语法错误
    /// - NoSections: 文件中没有任何节
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let ini = Ini::load_from_file_opt(path, parse_option())
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

        Self::from_ini(&ini, &path.display().to_string())
    }

    /// 从字符串解析配置
    pub fn parse_str(content: &str) -> ConfigResult<Self> {
        let ini = Ini::load_from_str_opt(content, parse_option())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        Self::from_ini(&ini, "<inline>")
    }

    fn from_ini(ini: &Ini, origin: &str) -> ConfigResult<Self> {
        let mut view = ConfigView::default();

        for (name, props) in ini.iter() {
            // 节外的全局键不计入节
            let Some(name) = name else { continue };

            let entries: HashMap<String, String> = props
                .iter()
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect();

            if !view.sections.contains_key(name) {
                view.section_order.push(name.to_string());
            }
            view.sections.entry(name.to_string()).or_default().extend(entries);
        }

        if view.section_order.is_empty() {
            return Err(ConfigError::NoSections(origin.to_string()));
        }

        tracing::debug!(sections = ?view.section_order, "配置节加载完成");
        Ok(view)
    }

    /// 按文件中出现顺序返回节名
    pub fn section_names(&self) -> &[String] {
        &self.section_order
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// 读取可选配置项
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// 读取必填配置项
    pub fn require(&self, section: &str, key: &str) -> ConfigResult<&str> {
        if !self.has_section(section) {
            return Err(ConfigError::MissingSection(section.to_string()));
        }
        self.get(section, key).ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// 读取必填配置项并解析
    pub fn require_parsed<T>(&self, section: &str, key: &str) -> ConfigResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.require(section, key)?;
        raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        })
    }

    /// 读取某数据源配置的产品类型列表
    ///
    /// # 返回
    /// - 节不存在: 空列表（数据源不激活）
    /// - 节存在但缺少 `<节名>_enums`: MissingKey
    /// - 逗号分隔,逐项去空白,忽略空项,每项必须为整数编码
    pub fn product_types(&self, kind: SourceKind) -> ConfigResult<Vec<ProductType>> {
        let section = kind.section();
        if !self.has_section(section) {
            return Ok(Vec::new());
        }

        let key = format!("{}_enums", section);
        let raw = self.require(section, &key)?;

        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<ProductType>()
                    .map_err(|e| ConfigError::InvalidValue {
                        section: section.to_string(),
                        key: key.clone(),
                        value: item.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect()
    }
}

fn parse_option() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        ..ParseOption::default()
    }
}

/// 解析配置文件路径
///
/// 优先级:
/// 1. 命令行显式指定
/// 2. 当前工作目录下的 config.ini
/// 3. 用户配置目录下的 injection-audit/config.ini
///
/// 都不存在时返回第 2 项（由加载阶段报告 NotFound）
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let local = std::env::current_dir()
        .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    if local.exists() {
        return local;
    }

    if let Some(user_dir) = dirs::config_dir() {
        let candidate = user_dir.join(CONFIG_DIR_NAME).join(DEFAULT_CONFIG_FILE);
        if candidate.exists() {
            return candidate;
        }
    }

    local
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[gpdb]
gpdb_user_name = audit
gpdb_pass = p@ss\word
gpdb_enums = 10, 20,,30

[injection]
start_ip = 10.1
injection_start_time = 2024-01-01 00:00:00
"#;

    #[test]
    fn test_parse_sections_in_order() {
        let view = ConfigView::parse_str(SAMPLE).unwrap();
        assert_eq!(view.section_names(), &["gpdb".to_string(), "injection".to_string()]);
        assert!(view.has_section("gpdb"));
        assert!(!view.has_section("presto"));
    }

    #[test]
    fn test_password_kept_literally() {
        let view = ConfigView::parse_str(SAMPLE).unwrap();
        assert_eq!(view.get("gpdb", "gpdb_pass"), Some("p@ss\\word"));
    }

    #[test]
    fn test_product_types_trimmed_and_empty_skipped() {
        let view = ConfigView::parse_str(SAMPLE).unwrap();
        let types = view.product_types(SourceKind::Warehouse).unwrap();
        assert_eq!(
            types,
            vec![ProductType::new(10), ProductType::new(20), ProductType::new(30)]
        );
    }

    #[test]
    fn test_absent_section_yields_empty_list() {
        let view = ConfigView::parse_str(SAMPLE).unwrap();
        assert!(view.product_types(SourceKind::LegacyRdbms).unwrap().is_empty());
    }

    #[test]
    fn test_missing_enums_key_is_error() {
        let view = ConfigView::parse_str("[presto]\npresto_host = h\n").unwrap();
        let err = view.product_types(SourceKind::PartitionedEngine).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { ref key, .. } if key == "presto_enums"));
    }

    #[test]
    fn test_non_numeric_enum_is_invalid_value() {
        let view = ConfigView::parse_str("[ase]\nase_enums = 1,x\n").unwrap();
        let err = view.product_types(SourceKind::LegacyRdbms).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref value, .. } if value == "x"));
    }

    #[test]
    fn test_no_sections_is_error() {
        let err = ConfigView::parse_str("key = value\n").unwrap_err();
        assert!(matches!(err, ConfigError::NoSections(_)));
    }

    #[test]
    fn test_require_reports_missing_section() {
        let view = ConfigView::parse_str(SAMPLE).unwrap();
        assert!(matches!(
            view.require("ase", "ase_host"),
            Err(ConfigError::MissingSection(_))
        ));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/tmp/custom.ini");
        assert_eq!(resolve_config_path(Some(path)), PathBuf::from("/tmp/custom.ini"));
    }
}
