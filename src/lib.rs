//! 同一内容のファイルをリンクにまとめるライブラリ

pub mod app;
pub mod cli;
pub mod grouper;
pub mod hasher;
pub mod i18n;
pub mod linker;
pub mod scanner;
