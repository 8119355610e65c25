//! 路径校验

use std::path::{Component, Path};

/// 是否为单个普通路径段（不含分隔符、`..`、根目录或盘符）
pub fn is_plain_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
