use crate::error::{AppResult, SourceError};
use crate::models::question::FormPage;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载一页表单
pub async fn load_toml_to_form_page(toml_file_path: &Path) -> AppResult<FormPage> {
    let path = toml_file_path.to_string_lossy().to_string();

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| SourceError::ReadFailed {
            path: path.clone(),
            source,
        })?;

    let mut page: FormPage =
        toml::from_str(&content).map_err(|source| SourceError::TomlParseFailed {
            path: path.clone(),
            source,
        })?;

    // 设置文件路径
    page.file_path = Some(path);

    tracing::info!(
        "成功加载表单 \"{}\"，共 {} 个题目",
        page.title,
        page.questions.len()
    );

    Ok(page)
}
