//! リンク置換処理

use std::fs::{self, Metadata, Permissions};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::grouper::same_physical_file;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// 1メンバーに対する置換結果
#[derive(Debug, PartialEq)]
pub enum LinkOutcome {
    /// ハードリンクに置換した
    Hardlinked,
    /// シンボリックリンクに置換した (リンク先を保持)
    Symlinked(PathBuf),
    /// ドライランのため置換せず、結果のみ記録した
    WouldLink,
    /// 既に同一の物理ファイルのためスキップ
    AlreadyLinked,
    /// safeモードでパーミッション/所有者が不一致のためスキップ
    AttrMismatch,
    /// statできないためスキップ
    SkippedStat(String),
    /// ファイルを削除できないためスキップ (ファイルは無変更)
    RemoveFailed(String),
    /// シンボリックリンク作成失敗、元ファイルを復元した
    Restored(String),
    /// シンボリックリンク作成失敗、復元にも失敗した
    RestoreFailed(String),
}

impl LinkOutcome {
    /// 統計に数える結果 (リンク成功またはドライランの作成予定) か
    pub fn counts_as_link(&self) -> bool {
        matches!(
            self,
            LinkOutcome::Hardlinked | LinkOutcome::Symlinked(_) | LinkOutcome::WouldLink
        )
    }
}

/// リンク置換の動作設定
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkOptions {
    /// 実際にファイルシステムを変更する (falseならドライラン)
    pub write_links: bool,
    /// ハードリンクを使わずシンボリックリンクのみ作成する
    pub symlink_only: bool,
    /// 相対ではなく絶対パスのシンボリックリンクを作成する
    pub absolute: bool,
    /// パーミッション/所有者が異なるファイルはリンクしない
    pub safe: bool,
}

/// リンク作成の集計結果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// 作成した (またはドライランで作成予定の) リンク数
    pub links: usize,
    /// 削減した容量 (バイト)
    pub saved: u64,
}

impl RunStats {
    /// 他の集計結果を取り込む
    pub fn merge(&mut self, other: RunStats) {
        self.links += other.links;
        self.saved += other.saved;
    }

    /// 2つの集計結果を合算して返す
    pub fn merged(mut self, other: RunStats) -> RunStats {
        self.merge(other);
        self
    }
}

/// 正準ファイル選択のための並べ替え (ベース名長→フルパス長の降順)
///
/// 最も長い名前が最も元の名前に近いと仮定して先頭に置く
/// (例: `libexample.so` より `libexample.so.1.0` を残す)。
pub fn order_candidates(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        let a_key = (
            a.file_name().map(|n| n.len()).unwrap_or(0),
            a.as_os_str().len(),
        );
        let b_key = (
            b.file_name().map(|n| n.len()).unwrap_or(0),
            b.as_os_str().len(),
        );
        b_key.cmp(&a_key)
    });
}

/// 内容が同一と確認済みのグループをリンクにまとめる
///
/// 先頭候補から順にstatを試し、最初に成功したファイルを正準ファイルとする。
/// 残りのメンバーを1件ずつリンクに置換し、結果をコールバックに通知する。
///
/// Args:
///     group: 内容が同一のファイルパスのリスト (2件以上)
///     opts: 置換の動作設定
///     report: (正準ファイル, メンバー, 結果) を受け取るコールバック
///
/// Returns:
///     このグループでの集計結果
pub fn link_group<F>(mut group: Vec<PathBuf>, opts: &LinkOptions, report: F) -> RunStats
where
    F: Fn(&Path, &Path, &LinkOutcome),
{
    let mut stats = RunStats::default();
    if group.len() < 2 {
        return stats;
    }
    order_candidates(&mut group);

    // statできるファイルが見つかるまで正準候補を順に試す
    let mut members = group.into_iter();
    let (canonical, canonical_meta) = loop {
        let Some(candidate) = members.next() else {
            return stats;
        };
        match fs::metadata(&candidate) {
            Ok(meta) => break (candidate, meta),
            Err(e) => {
                let outcome = LinkOutcome::SkippedStat(e.to_string());
                report(&candidate, &candidate, &outcome);
            }
        }
    };

    for member in members {
        let outcome = link_member(&canonical, &canonical_meta, &member, opts);
        if outcome.counts_as_link() {
            stats.links += 1;
            stats.saved += canonical_meta.len();
        }
        report(&canonical, &member, &outcome);
    }
    stats
}

/// 1メンバーを正準ファイルへのリンクに置換する
fn link_member(
    canonical: &Path,
    canonical_meta: &Metadata,
    member: &Path,
    opts: &LinkOptions,
) -> LinkOutcome {
    let member_meta = match fs::metadata(member) {
        Ok(m) => m,
        Err(e) => return LinkOutcome::SkippedStat(e.to_string()),
    };
    if same_physical_file(canonical_meta, &member_meta) {
        return LinkOutcome::AlreadyLinked;
    }
    if opts.safe && !same_attributes(canonical_meta, &member_meta) {
        return LinkOutcome::AttrMismatch;
    }
    if !opts.write_links {
        return LinkOutcome::WouldLink;
    }

    if let Err(e) = fs::remove_file(member) {
        return LinkOutcome::RemoveFailed(e.to_string());
    }

    if !opts.symlink_only {
        if fs::hard_link(canonical, member).is_ok() {
            // パーミッションを正準ファイルに合わせる (失敗しても続行)
            let _ = fs::set_permissions(member, canonical_meta.permissions());
            return LinkOutcome::Hardlinked;
        }
        // ハードリンク不可 (ファイルシステム跨ぎ等) はシンボリックリンクで代替
    }

    let target = symlink_target(canonical, member, opts.absolute);
    match make_symlink(&target, member) {
        Ok(()) => LinkOutcome::Symlinked(target),
        Err(e) => {
            // メンバーは削除済みのため、正準ファイルの内容で復元する
            match restore_file(canonical, member, member_meta.permissions()) {
                Ok(()) => LinkOutcome::Restored(e.to_string()),
                Err(restore_err) => {
                    LinkOutcome::RestoreFailed(format!("{} ({})", e, restore_err))
                }
            }
        }
    }
}

/// シンボリックリンクのリンク先パスを計算する
///
/// 相対モードではメンバーのディレクトリから正準ファイルのディレクトリへの
/// 相対パスに正準ファイルのベース名を連結する。相対パスを計算できない場合は
/// 正準ファイルのパスをそのまま使う。
pub fn symlink_target(canonical: &Path, member: &Path, absolute: bool) -> PathBuf {
    if absolute {
        return canonical.to_path_buf();
    }
    let Some(base) = canonical.file_name() else {
        return canonical.to_path_buf();
    };
    let member_dir = member.parent().unwrap_or(Path::new(""));
    let canonical_dir = canonical.parent().unwrap_or(Path::new(""));
    match relative_path(member_dir, canonical_dir) {
        Some(rel) if rel.as_os_str().is_empty() => PathBuf::from(base),
        Some(rel) => rel.join(base),
        None => canonical.to_path_buf(),
    }
}

/// fromディレクトリからtoディレクトリへの相対パスを求める
///
/// 一方のみ絶対パスの場合は計算できないためNoneを返す。
fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
    if from.is_absolute() != to.is_absolute() {
        return None;
    }
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for component in &to[common..] {
        rel.push(component.as_os_str());
    }
    Some(rel)
}

// テストからシンボリックリンク作成を失敗させるためのフック
#[cfg(all(test, unix))]
thread_local! {
    static FORCE_SYMLINK_FAILURE: std::cell::Cell<bool> = std::cell::Cell::new(false);
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(test)]
    if FORCE_SYMLINK_FAILURE.with(|f| f.get()) {
        return Err(io::Error::new(io::ErrorKind::Other, "symlink failed"));
    }
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn make_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

/// パーミッションと所有者 (uid/gid) が一致するか確認する (safeモード用)
#[cfg(unix)]
fn same_attributes(a: &Metadata, b: &Metadata) -> bool {
    a.mode() == b.mode() && a.uid() == b.uid() && a.gid() == b.gid()
}

#[cfg(not(unix))]
fn same_attributes(a: &Metadata, b: &Metadata) -> bool {
    a.permissions() == b.permissions()
}

/// 正準ファイルの内容で元のパスにファイルを復元する
///
/// 同一ディレクトリ内の一時ファイルへ書き込み、パーミッションを設定してから
/// renameで置き換える。途中で失敗しても元のパスに中途半端なファイルが
/// 残ることはない。
fn restore_file(canonical: &Path, dest: &Path, perm: Permissions) -> io::Result<()> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut source = fs::File::open(canonical)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    io::copy(&mut source, tmp.as_file_mut())?;
    tmp.as_file().set_permissions(perm)?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
