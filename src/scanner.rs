//! ディレクトリ走査とサイズ別バケット構築

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use glob::Pattern;
use walkdir::WalkDir;

/// ベース名フィルタ用のglobパターンをコンパイルする
///
/// Args:
///     pattern: globパターン文字列 (Noneなら全ファイルが対象)
///
/// Returns:
///     成功時はコンパイル済みパターン、不正なパターンはエラー
pub fn compile_pattern(pattern: Option<&str>) -> Result<Option<Pattern>> {
    match pattern {
        Some(p) => {
            let compiled =
                Pattern::new(p).with_context(|| format!("invalid pattern: {}", p))?;
            Ok(Some(compiled))
        }
        None => Ok(None),
    }
}

/// 探索ルートを検証・正規化する
///
/// 存在しないルートやディレクトリ以外のルートは実行全体のエラーとする。
/// 複数ルートのうち、他のルートの配下にあるものは二重走査を防ぐため
/// 警告コールバック経由で通知して除外する。空リストはカレントディレクトリに
/// 置き換える。
///
/// Args:
///     roots: 探索対象ディレクトリのリスト
///     warn: 除外したルートと包含するルートを受け取るコールバック
///
/// Returns:
///     正規化済みルートのリスト
pub fn normalize_roots<F>(roots: &[String], warn: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path, &Path),
{
    let mut cleaned = Vec::new();
    for root in roots {
        // "a/./b" や末尾スラッシュを取り除く
        let path: PathBuf = Path::new(root).components().collect();
        let meta = fs::metadata(&path)
            .with_context(|| format!("cannot access {}", path.display()))?;
        if !meta.is_dir() {
            bail!("{} is not a directory", path.display());
        }
        cleaned.push(path);
    }

    if cleaned.is_empty() {
        cleaned.push(PathBuf::from("."));
    }

    if cleaned.len() < 2 {
        return Ok(cleaned);
    }

    // 既出ルートの配下 (または同一) のルートは除外する
    let mut kept: Vec<PathBuf> = Vec::new();
    for root in cleaned {
        if let Some(parent) = kept.iter().find(|k| root.starts_with(k)) {
            warn(&root, parent);
            continue;
        }
        kept.retain(|k| {
            if k.starts_with(&root) {
                warn(k, &root);
                false
            } else {
                true
            }
        });
        kept.push(root);
    }
    Ok(kept)
}

/// ルート以下の対象ファイルを列挙してコールバックに渡す
///
/// 対象は通常ファイルのみ (シンボリックリンクは追跡しない)。空ファイルは
/// リンクしても意味がないため除外する。個々のエントリの走査エラーは
/// 警告コールバックに通知して続行する。
fn walk_regular_files<F, V>(
    roots: &[PathBuf],
    pattern: Option<&Pattern>,
    warn: &F,
    mut visit: V,
) where
    F: Fn(&str),
    V: FnMut(PathBuf, u64),
{
    for root in roots {
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn(&e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn(&e.to_string());
                    continue;
                }
            };
            if meta.len() == 0 {
                continue;
            }
            if let Some(pat) = pattern {
                let name = entry.file_name().to_string_lossy();
                if !pat.matches(&name) {
                    continue;
                }
            }
            visit(entry.into_path(), meta.len());
        }
    }
}

/// ルート以下を走査し、ファイルサイズごとのパスリストを構築する
///
/// 重複の可能性がない1件のみのサイズは除外して返す。
///
/// Args:
///     roots: 正規化済み探索ルート
///     pattern: ベース名フィルタ (Noneなら全ファイル)
///     warn: 走査エラーの警告コールバック
///
/// Returns:
///     サイズをキーとし、2件以上のパスを持つバケットのみのHashMap
pub fn build_size_buckets<F>(
    roots: &[PathBuf],
    pattern: Option<&Pattern>,
    warn: F,
) -> HashMap<u64, Vec<PathBuf>>
where
    F: Fn(&str),
{
    let mut buckets: HashMap<u64, Vec<PathBuf>> = HashMap::new();
    walk_regular_files(roots, pattern, &warn, |path, size| {
        buckets.entry(size).or_default().push(path);
    });
    buckets.retain(|_, paths| paths.len() >= 2);
    buckets
}

/// ルート以下から指定サイズのファイルのみを列挙する (updateモード用)
///
/// Args:
///     roots: 正規化済み探索ルート
///     size: 対象ファイルサイズ (バイト)
///     pattern: ベース名フィルタ (Noneなら全ファイル)
///     warn: 走査エラーの警告コールバック
///
/// Returns:
///     サイズが一致したパスのリスト
pub fn files_of_size<F>(
    roots: &[PathBuf],
    size: u64,
    pattern: Option<&Pattern>,
    warn: F,
) -> Vec<PathBuf>
where
    F: Fn(&str),
{
    let mut found = Vec::new();
    walk_regular_files(roots, pattern, &warn, |path, file_size| {
        if file_size == size {
            found.push(path);
        }
    });
    found
}
