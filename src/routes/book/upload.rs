use std::path::Path;

use uuid::Uuid;

use crate::error::AppError;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024; // 5MB

/// 按文件头识别图片类型，只认 JPEG/PNG/GIF。
fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        _ => None,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// 校验并落盘上传的图片，返回对外可访问的 URL 路径。
/// 文件名用 UUID 重新生成，不信任客户端提供的名字。
pub async fn save_image(upload_dir: &str, data: &[u8]) -> Result<String, AppError> {
    if data.is_empty() {
        return Err(AppError::Upload("图片内容为空".to_string()));
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::Upload("图片大小不能超过5MB".to_string()));
    }
    let mime = sniff_image(data)
        .ok_or_else(|| AppError::Upload("仅支持 JPEG、PNG、GIF 格式的图片".to_string()))?;

    if let Err(e) = tokio::fs::create_dir_all(upload_dir).await {
        tracing::error!("Failed to create upload directory {}: {}", upload_dir, e);
        return Err(AppError::Storage("保存图片失败".to_string()));
    }

    let filename = format!("{}.{}", Uuid::new_v4(), extension_for(mime));
    let path = Path::new(upload_dir).join(&filename);
    if let Err(e) = tokio::fs::write(&path, data).await {
        tracing::error!("Failed to write upload {}: {}", path.display(), e);
        return Err(AppError::Storage("保存图片失败".to_string()));
    }

    tracing::info!("Image uploaded: {} ({} bytes)", filename, data.len());
    Ok(format!("/uploads/{}", filename))
}
