//! ファイル内容のハッシュ計算

use std::fs::File;
use std::io;
use std::path::Path;

/// ファイル全体をストリーミングで読み込み、BLAKE3ダイジェストを返す
///
/// Args:
///     path: ハッシュ対象のファイルパス
///
/// Returns:
///     成功時はダイジェスト、オープン/読み込み失敗時はI/Oエラー
pub fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_hash_file_matches_one_shot_hash() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        let content = b"known content for digest check";
        File::create(&path).unwrap().write_all(content).unwrap();

        // ストリーミング計算と一括計算で同じダイジェストになる
        assert_eq!(hash_file(&path).unwrap(), blake3::hash(content));
    }

    #[test]
    fn test_hash_file_same_content_same_hash() {
        let temp_dir = TempDir::new().unwrap();
        let file1 = temp_dir.path().join("file1");
        let file2 = temp_dir.path().join("file2");
        File::create(&file1).unwrap().write_all(b"same content").unwrap();
        File::create(&file2).unwrap().write_all(b"same content").unwrap();

        assert_eq!(hash_file(&file1).unwrap(), hash_file(&file2).unwrap());
    }

    #[test]
    fn test_hash_file_different_content_different_hash() {
        let temp_dir = TempDir::new().unwrap();
        let file1 = temp_dir.path().join("file1");
        let file2 = temp_dir.path().join("file2");
        // 同じ長さで1バイトだけ異なる内容
        File::create(&file1).unwrap().write_all(b"content A").unwrap();
        File::create(&file2).unwrap().write_all(b"content B").unwrap();

        assert_ne!(hash_file(&file1).unwrap(), hash_file(&file2).unwrap());
    }

    #[test]
    fn test_hash_file_nonexistent_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        assert!(hash_file(&missing).is_err());
    }
}
