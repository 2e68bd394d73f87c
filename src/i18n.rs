//! 国際化 (i18n) サポート

use sys_locale::get_locale;

/// 現在のロケールが日本語かどうかを判定する
pub fn is_japanese() -> bool {
    get_locale()
        .map(|l| l.starts_with("ja"))
        .unwrap_or(false)
}

/// メッセージキー
#[derive(Clone, Copy)]
pub enum Msg {
    // 処理中メッセージ
    LinkingIn,
    UpdateFile,
    RootAlreadyIncluded,

    // 個別リンクメッセージ
    Hardlink,
    Symlink,
    AttrMismatch,
    RemoveFailed,
    SymlinkFailed,
    RestoreFailed,

    // サマリー
    SummaryDryRun,
    SummaryComplete,
    ReplacedFiles,
    ReducedStorage,
}

/// ローカライズされたメッセージを取得する
pub fn msg(key: Msg) -> &'static str {
    if is_japanese() {
        msg_ja(key)
    } else {
        msg_en(key)
    }
}

fn msg_ja(key: Msg) -> &'static str {
    match key {
        // 処理中メッセージ
        Msg::LinkingIn => "同一ファイルをリンクします",
        Msg::UpdateFile => "基準ファイル",
        Msg::RootAlreadyIncluded => "別のルートに含まれるため除外",

        // 個別リンクメッセージ
        Msg::Hardlink => "ハードリンク",
        Msg::Symlink => "シンボリックリンク",
        Msg::AttrMismatch => "パーミッション/所有者が異なるためスキップ",
        Msg::RemoveFailed => "ファイルを削除できません",
        Msg::SymlinkFailed => "シンボリックリンク作成失敗 (元ファイルを復元)",
        Msg::RestoreFailed => "元ファイルの復元に失敗",

        // サマリー
        Msg::SummaryDryRun => "=== ドライラン結果 (-w 指定時の見込み) ===",
        Msg::SummaryComplete => "=== 処理完了 ===",
        Msg::ReplacedFiles => "リンクに置換したファイル数",
        Msg::ReducedStorage => "削減した容量",
    }
}

fn msg_en(key: Msg) -> &'static str {
    match key {
        // Processing
        Msg::LinkingIn => "Linking identical files in",
        Msg::UpdateFile => "Update file",
        Msg::RootAlreadyIncluded => "Skipped (already included in another root)",

        // Per-link messages
        Msg::Hardlink => "hardlink",
        Msg::Symlink => "symlink",
        Msg::AttrMismatch => "Skipped (permissions or ownership differ)",
        Msg::RemoveFailed => "Cannot remove file",
        Msg::SymlinkFailed => "Failed to create symlink (original file restored)",
        Msg::RestoreFailed => "Failed to restore original file",

        // Summary
        Msg::SummaryDryRun => "=== Dry Run Results (what -w would do) ===",
        Msg::SummaryComplete => "=== Complete ===",
        Msg::ReplacedFiles => "Files replaced with links",
        Msg::ReducedStorage => "Storage reduced",
    }
}

/// バイト数を読みやすい文字列に整形する
pub fn format_size(size: u64) -> String {
    const KILOBYTE: f64 = 1024.0;
    const MEGABYTE: f64 = KILOBYTE * 1024.0;
    const GIGABYTE: f64 = MEGABYTE * 1024.0;

    let bytes = size as f64;
    if bytes > GIGABYTE {
        format!("{:.1}G", bytes / GIGABYTE)
    } else if bytes > MEGABYTE {
        format!("{:.1}M", bytes / MEGABYTE)
    } else if bytes > KILOBYTE {
        format!("{:.1}K", bytes / KILOBYTE)
    } else {
        format!("{} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_keys_have_translations() {
        // 全てのキーに対応する翻訳があることを確認
        let keys = [
            Msg::LinkingIn,
            Msg::UpdateFile,
            Msg::RootAlreadyIncluded,
            Msg::Hardlink,
            Msg::Symlink,
            Msg::AttrMismatch,
            Msg::RemoveFailed,
            Msg::SymlinkFailed,
            Msg::RestoreFailed,
            Msg::SummaryDryRun,
            Msg::SummaryComplete,
            Msg::ReplacedFiles,
            Msg::ReducedStorage,
        ];

        for key in keys {
            assert!(!msg_ja(key).is_empty());
            assert!(!msg_en(key).is_empty());
        }
    }

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 bytes");
        assert_eq!(format_size(1024), "1024 bytes");
    }

    #[test]
    fn test_format_size_kilobytes() {
        assert_eq!(format_size(2048), "2.0K");
        assert_eq!(format_size(1536), "1.5K");
    }

    #[test]
    fn test_format_size_megabytes() {
        assert_eq!(format_size(3 * 1024 * 1024), "3.0M");
    }

    #[test]
    fn test_format_size_gigabytes() {
        assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2.0G");
    }
}
