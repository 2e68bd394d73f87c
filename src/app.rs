//! 実行全体の制御と結果集計

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use crate::cli::Args;
use crate::grouper::hash_groups;
use crate::hasher::hash_file;
use crate::i18n::{format_size, msg, Msg};
use crate::linker::{link_group, symlink_target, LinkOptions, LinkOutcome, RunStats};
use crate::scanner::{build_size_buckets, compile_pattern, files_of_size, normalize_roots};

/// 動作設定
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// ベース名フィルタのglobパターン
    pub pattern: Option<String>,
    /// 実際にリンクを作成する (falseならドライラン)
    pub write_links: bool,
    /// ハードリンクを使わずシンボリックリンクのみ作成する
    pub symlink_only: bool,
    /// 相対ではなく絶対パスのシンボリックリンクを作成する
    pub absolute: bool,
    /// パーミッション/所有者が異なるファイルはリンクしない
    pub safe: bool,
    /// 出力を抑制する
    pub quiet: bool,
    /// 個々のリンク作成メッセージを表示する
    pub verbose: bool,
}

impl Options {
    fn from_args(args: &Args) -> Self {
        Options {
            pattern: args.pattern.clone(),
            write_links: args.write,
            symlink_only: args.symlink,
            absolute: args.absolute,
            safe: args.safe,
            quiet: args.quiet,
            // quiet指定時はverboseを無効にする
            verbose: args.verbose && !args.quiet,
        }
    }

    fn link_options(&self) -> LinkOptions {
        LinkOptions {
            write_links: self.write_links,
            symlink_only: self.symlink_only,
            absolute: self.absolute,
            safe: self.safe,
        }
    }
}

/// ディレクトリツリー全体の重複ファイルをリンクにまとめる
///
/// ルートを走査してサイズ別バケットを構築し、バケットごとに並列で
/// 内容別グループ化とリンク置換を行う。バケット単位の集計結果を合算して返す。
///
/// Args:
///     roots: 探索対象ディレクトリのリスト
///     opts: 動作設定
///
/// Returns:
///     成功時は集計結果、ルートやパターンが不正な場合はエラー
pub fn link_same(roots: &[String], opts: &Options) -> Result<RunStats> {
    let pattern = compile_pattern(opts.pattern.as_deref())?;
    let roots = normalize_roots(roots, |dropped, kept| {
        if !opts.quiet {
            eprintln!(
                "{}: {} ({})",
                msg(Msg::RootAlreadyIncluded),
                dropped.display(),
                kept.display()
            );
        }
    })?;
    if !opts.quiet {
        println!("{}: {}", msg(Msg::LinkingIn), join_roots(&roots));
    }

    let buckets = build_size_buckets(&roots, pattern.as_ref(), |warning| {
        if !opts.quiet {
            eprintln!("{}", warning);
        }
    });

    // バケット同士はサイズで排他のため、データ依存なしに並列処理できる
    let stats = buckets
        .into_par_iter()
        .map(|(_, paths)| process_bucket(paths, opts))
        .reduce(RunStats::default, RunStats::merged);
    Ok(stats)
}

/// 指定ファイルと同一内容のファイルをツリー内から探してリンクにまとめる
///
/// 基準ファイルと同一サイズのファイルのみをハッシュ比較し、一致したものと
/// 基準ファイル自身で1つのグループを作って置換する。
///
/// Args:
///     update_file: 基準ファイルのパス
///     roots: 探索対象ディレクトリのリスト
///     opts: 動作設定
///
/// Returns:
///     成功時は集計結果。基準ファイルが存在しない・通常ファイルでない・
///     空ファイルの場合はエラー
pub fn link_same_update(update_file: &str, roots: &[String], opts: &Options) -> Result<RunStats> {
    let pattern = compile_pattern(opts.pattern.as_deref())?;
    let update_path = PathBuf::from(update_file);
    let update_meta = fs::metadata(&update_path)
        .with_context(|| format!("cannot access {}", update_path.display()))?;
    if !update_meta.is_file() {
        bail!("{} is not a regular file", update_path.display());
    }
    if update_meta.len() == 0 {
        bail!("{} is empty", update_path.display());
    }
    let update_digest = hash_file(&update_path)
        .with_context(|| format!("cannot hash {}", update_path.display()))?;

    let roots = normalize_roots(roots, |dropped, kept| {
        if !opts.quiet {
            eprintln!(
                "{}: {} ({})",
                msg(Msg::RootAlreadyIncluded),
                dropped.display(),
                kept.display()
            );
        }
    })?;
    if !opts.quiet {
        println!("{}: {}", msg(Msg::UpdateFile), update_path.display());
        println!("{}: {}", msg(Msg::LinkingIn), join_roots(&roots));
    }

    // 基準ファイル自身を必ずグループに含める
    let mut same = vec![update_path];
    let candidates = files_of_size(&roots, update_meta.len(), pattern.as_ref(), |warning| {
        if !opts.quiet {
            eprintln!("{}", warning);
        }
    });
    for path in candidates {
        match hash_file(&path) {
            Ok(digest) if digest == update_digest => same.push(path),
            Ok(_) => {}
            Err(e) => {
                if !opts.quiet {
                    eprintln!("{}: {}", path.display(), e);
                }
            }
        }
    }

    let mut stats = RunStats::default();
    if same.len() > 1 {
        stats.merge(link_group(same, &opts.link_options(), |canonical, member, outcome| {
            report_outcome(canonical, member, outcome, opts);
        }));
    }
    Ok(stats)
}

/// 1つのサイズバケットを内容別グループ化し、グループ単位でリンク置換する
fn process_bucket(paths: Vec<PathBuf>, opts: &Options) -> RunStats {
    let mut stats = RunStats::default();
    let groups = hash_groups(paths, |path, err| {
        if !opts.quiet {
            eprintln!("{}: {}", path.display(), err);
        }
    });
    for group in groups {
        stats.merge(link_group(group, &opts.link_options(), |canonical, member, outcome| {
            report_outcome(canonical, member, outcome, opts);
        }));
    }
    stats
}

/// 置換結果を設定に応じて表示する
fn report_outcome(canonical: &Path, member: &Path, outcome: &LinkOutcome, opts: &Options) {
    match outcome {
        LinkOutcome::Hardlinked => {
            if opts.verbose {
                println!(
                    "{}: {} <--> {}",
                    msg(Msg::Hardlink),
                    member.display(),
                    canonical.display()
                );
            }
        }
        LinkOutcome::Symlinked(target) => {
            if opts.verbose {
                println!(
                    "{}: {} ---> {}",
                    msg(Msg::Symlink),
                    member.display(),
                    target.display()
                );
            }
        }
        LinkOutcome::WouldLink => {
            if opts.verbose {
                if opts.symlink_only {
                    let target = symlink_target(canonical, member, opts.absolute);
                    println!(
                        "{}: {} ---> {}",
                        msg(Msg::Symlink),
                        member.display(),
                        target.display()
                    );
                } else {
                    println!(
                        "{}: {} <--> {}",
                        msg(Msg::Hardlink),
                        member.display(),
                        canonical.display()
                    );
                }
            }
        }
        LinkOutcome::AlreadyLinked => {}
        LinkOutcome::AttrMismatch => {
            if opts.verbose {
                println!("{}: {}", msg(Msg::AttrMismatch), member.display());
            }
        }
        LinkOutcome::SkippedStat(e) => {
            if opts.verbose {
                eprintln!("{}: {}", member.display(), e);
            }
        }
        LinkOutcome::RemoveFailed(e) => {
            if !opts.quiet {
                eprintln!("{}: {} - {}", msg(Msg::RemoveFailed), member.display(), e);
            }
        }
        LinkOutcome::Restored(e) => {
            if !opts.quiet {
                eprintln!("{}: {} - {}", msg(Msg::SymlinkFailed), member.display(), e);
            }
        }
        LinkOutcome::RestoreFailed(e) => {
            // 復元失敗はquietでも必ず表示する
            eprintln!("{}: {} - {}", msg(Msg::RestoreFailed), member.display(), e);
        }
    }
}

fn join_roots(roots: &[PathBuf]) -> String {
    roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_summary(stats: &RunStats, opts: &Options) {
    if opts.quiet {
        return;
    }
    println!();
    if opts.write_links {
        println!("{}", msg(Msg::SummaryComplete));
    } else {
        println!("{}", msg(Msg::SummaryDryRun));
    }
    println!("  {}: {}", msg(Msg::ReplacedFiles), stats.links);
    println!("  {}: {}", msg(Msg::ReducedStorage), format_size(stats.saved));
}

/// CLI引数から実行し、終了コードを返す
pub fn run(args: Args) -> i32 {
    let opts = Options::from_args(&args);
    let result = match &args.update {
        Some(update) => link_same_update(update, &args.roots, &opts),
        None => link_same(&args.roots, &opts),
    };
    match result {
        Ok(stats) => {
            print_summary(&stats, &opts);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}
