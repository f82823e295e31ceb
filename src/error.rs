//! 错误类型
//!
//! 按来源分组：页面解析 / 外部服务 / 查询流程 / 表格解析 / 配置 / 文件 / 导出

use thiserror::Error;

use crate::models::ProgressState;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 页面解析错误
    #[error("页面解析错误: {0}")]
    PageParse(#[from] PageParseError),
    /// 外部生成服务错误
    #[error("外部服务错误: {0}")]
    Service(#[from] ServiceError),
    /// 分块查询失败
    #[error("查询错误: {0}")]
    Query(#[from] QueryError),
    /// 表格解析错误
    #[error("表格解析错误: {0}")]
    Tabular(#[from] TabularParseError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 结果导出错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
}

/// 页面解析错误
///
/// 格式错误的页码标记不会触发该错误，只会被当作普通内容行
#[derive(Debug, Error)]
pub enum PageParseError {
    /// 输入不是合法的 UTF-8 文本
    #[error("文档不是合法的 UTF-8 文本 (偏移 {offset})")]
    InvalidUtf8 { offset: usize },
}

/// 外部生成服务错误
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 请求构建失败
    #[error("构建请求失败 (模型: {model}): {source}")]
    RequestBuildFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 调用失败
    #[error("API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回结果为空
    #[error("返回结果为空 (模型: {model})")]
    EmptyResponse { model: String },
    /// 返回内容为空
    #[error("返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 分块查询错误
#[derive(Debug, Error)]
pub enum QueryError {
    /// 某个分块调用失败，剩余分块全部中止
    ///
    /// `progress` 保存失败之前已经累积的结果，调用方仍应把整次查询视为失败
    #[error("第 {} 块 (页 {page_range}) 查询失败: {source}", .chunk_index + 1)]
    ChunkFailed {
        chunk_index: usize,
        page_range: String,
        #[source]
        source: ServiceError,
        progress: Box<ProgressState>,
    },
}

/// 表格块解析错误（可恢复，调用方回退为原始文本）
#[derive(Debug, Error)]
pub enum TabularParseError {
    /// 分隔文本解析失败
    #[error("分隔文本解析失败 (共 {line_count} 行): {source}")]
    Malformed {
        line_count: usize,
        #[source]
        source: csv::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 取值不合法
    #[error("配置项 {key} 取值不合法: {reason}")]
    InvalidValue { key: String, reason: String },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV 读写失败
    #[error("CSV处理失败: {0}")]
    Csv(#[from] csv::Error),
    /// JSON 序列化失败
    #[error("JSON序列化失败: {0}")]
    Json(#[from] serde_json::Error),
    /// xlsx 生成失败
    #[error("xlsx生成失败: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    /// 导出内容不是 UTF-8
    #[error("导出内容不是合法的 UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// 表头与预期不一致
    #[error("表头不匹配: {found:?}")]
    HeaderMismatch { found: Vec<String> },
    /// 页码列无法解析
    #[error("第 {row} 行页码无法解析: '{value}'")]
    BadPage { row: usize, value: String },
}

// ========== 便捷构造函数 ==========

impl FileError {
    /// 创建文件读取错误
    pub fn read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        FileError::ReadFailed {
            path: path.into(),
            source,
        }
    }

    /// 创建文件写入错误
    pub fn write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        FileError::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

impl ServiceError {
    /// 创建API调用错误
    pub fn api_call_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ServiceError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
