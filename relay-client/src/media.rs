//! 媒体类型推断
//!
//! 按文件扩展名给出粗粒度的媒体类型标签，随文件帧一起传输。

/// 按扩展名推断媒体类型标签
pub fn media_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "avi" | "mov" | "mkv" => "video",
        "mp3" | "wav" | "aac" => "audio",
        "jpg" | "jpeg" | "png" | "gif" => "photo",
        _ => "file",
    }
}
