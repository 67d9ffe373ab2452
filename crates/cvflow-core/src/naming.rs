//! イメージ名とタスク名の規約

use crate::version::Version;

/// 名前空間付きのイメージ名 (例: "cv-toollatex")
pub fn full_image_name(prefix: &str, image: &str) -> String {
    format!("{}-{}", prefix.to_lowercase(), image)
}

/// バージョンタグ付きのイメージ名 (例: "cv-toollatex:master-2019-01-07-3f2a9c1")
pub fn tagged_image_name(prefix: &str, image: &str, version: &Version) -> String {
    format!("{}:{}", full_image_name(prefix, image), version.tag())
}

/// CLIで扱いやすい形式に変換 (`_` -> `-`)
pub fn cli_name(name: &str) -> String {
    name.replace('_', "-")
}
