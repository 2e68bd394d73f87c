//! サイズ一致ファイルの内容別グループ化

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use crate::hasher::hash_file;

/// 2つのメタデータが同一の物理ファイル (デバイス+inode一致) を指すか確認する
///
/// Args:
///     a: 比較対象のメタデータ1
///     b: 比較対象のメタデータ2
///
/// Returns:
///     同一の物理ファイルならtrue
#[cfg(unix)]
pub fn same_physical_file(a: &Metadata, b: &Metadata) -> bool {
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
pub fn same_physical_file(_a: &Metadata, _b: &Metadata) -> bool {
    // 非Unix環境ではinode比較ができないため、常に別ファイルとして扱う
    false
}

/// 1つのサイズバケットを内容ごとのグループに分割する
///
/// まず (デバイス, inode) が一致するパスをクラスタ化する。既にハードリンク
/// 済みのファイル群は内容が同一であることが保証されるため、代表1つの
/// ハッシュを共有して再読み込みを省略する。その後クラスタ代表のダイジェストで
/// グループ化する。statやハッシュに失敗したパスはエラーコールバックに通知して
/// バケットから除外する。
///
/// Args:
///     paths: 同一サイズのファイルパスのリスト
///     on_error: 除外したパスとI/Oエラーを受け取るコールバック
///
/// Returns:
///     内容が同一と確認された2件以上のパスを持つグループのリスト
pub fn hash_groups<F>(paths: Vec<PathBuf>, on_error: F) -> Vec<Vec<PathBuf>>
where
    F: Fn(&Path, &io::Error),
{
    // (デバイス, inode) 一致でクラスタ化
    let mut clusters: Vec<(Metadata, Vec<PathBuf>)> = Vec::new();
    'next_path: for path in paths {
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                on_error(&path, &e);
                continue;
            }
        };
        for (cluster_meta, members) in clusters.iter_mut() {
            if same_physical_file(cluster_meta, &meta) {
                members.push(path);
                continue 'next_path;
            }
        }
        clusters.push((meta, vec![path]));
    }

    // クラスタ代表のみハッシュし、ダイジェストでまとめる
    let mut groups: HashMap<[u8; 32], Vec<PathBuf>> = HashMap::new();
    for (_, members) in clusters {
        let digest = match hash_file(&members[0]) {
            Ok(d) => d,
            Err(e) => {
                on_error(&members[0], &e);
                continue;
            }
        };
        groups.entry(*digest.as_bytes()).or_default().extend(members);
    }

    groups.into_values().filter(|g| g.len() >= 2).collect()
}
