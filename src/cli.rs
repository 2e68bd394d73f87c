//! コマンドライン引数のパースと設定

use clap::Parser;

/// 同一内容のファイルをハードリンク/シンボリックリンクにまとめるツール
#[derive(Parser, Debug)]
#[command(name = "linksame")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 探索対象のディレクトリ (複数指定可、デフォルト: カレントディレクトリ)
    #[arg(default_value = ".")]
    pub roots: Vec<String>,

    /// ベース名がGLOBパターンに一致するファイルのみ対象にする
    #[arg(short, long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// 実際にリンクを作成する (指定しない場合はドライラン)
    #[arg(short = 'w', long = "write")]
    pub write: bool,

    /// ハードリンクを使わずシンボリックリンクのみ作成する
    #[arg(long)]
    pub symlink: bool,

    /// 相対ではなく絶対パスのシンボリックリンクを作成する
    #[arg(long)]
    pub absolute: bool,

    /// 指定ファイルと同一内容のファイルのみリンクする
    #[arg(short, long, value_name = "FILE")]
    pub update: Option<String>,

    /// パーミッションや所有者が異なるファイルはリンクしない
    #[arg(long)]
    pub safe: bool,

    /// 出力を抑制する (verboseより優先)
    #[arg(short, long)]
    pub quiet: bool,

    /// 個々のリンク作成メッセージを表示する
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 引数をパースして返す
    pub fn parse_args() -> Self {
        Args::parse()
    }
}
